//! Rule compilation.
//!
//! Mapping rules arrive from configuration as plain data (`RuleSpec`):
//! address strings, numbers and small expression strings. Before the engine
//! sees them they are compiled once into [`CompiledRule`]s:
//!
//! - every expression is parsed up front, so a typo fails at startup rather
//!   than on the first matching message;
//! - every argument template is classified as a [`Slot::Constant`] (no free
//!   variables, value precomputed) or a [`Slot::Variable`] (joins the
//!   equation system when matching).
//!
//! ```text
//! ["/control", 1, "c+9", "v * 127"]
//!      │       │    │        └─ Variable(v * 127)
//!      │       │    └────────── Variable(c+9)
//!      │       └─────────────── Constant(1)
//!      └─────────────────────── address
//! ```
//!
//! ## Invariants
//!
//! - Rule order inside a table is declaration order; dispatch relies on it.
//! - A rule's label (`<surface>#<index>` unless named) is stable across
//!   reloads of the same configuration and is what diagnostics print.

use std::collections::{BTreeMap, BTreeSet};

use crate::Direction;
use crate::config::{RuleSpec, TemplateValue};
use crate::error::ConfigError;
use crate::expr::{Constants, Expr};

/// One positional argument template.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// No free variables; the supplied argument must equal `value` exactly.
    Constant { expr: Expr, value: f64 },
    /// References free variables; matching adds `expr == arg` to the system.
    Variable { expr: Expr, variables: BTreeSet<String> },
}

impl Slot {
    pub fn expr(&self) -> &Expr {
        match self {
            Slot::Constant { expr, .. } | Slot::Variable { expr, .. } => expr,
        }
    }

    fn compile(expr: Expr, constants: &Constants, context: impl Fn() -> String) -> Result<Self, ConfigError> {
        let variables = expr.variables(constants);
        if variables.is_empty() {
            let value = expr
                .evaluate(constants)
                .map_err(|source| ConfigError::InvalidExpression { context: context(), source })?;
            Ok(Slot::Constant { expr, value })
        } else {
            Ok(Slot::Variable { expr, variables })
        }
    }
}

/// An address literal plus its argument templates.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub address: String,
    pub slots: Vec<Slot>,
}

impl Template {
    fn compile(
        label: &str,
        key: &'static str,
        items: &[TemplateValue],
        constants: &Constants,
    ) -> Result<Self, ConfigError> {
        let Some((TemplateValue::Text(address), args)) = items.split_first() else {
            return Err(ConfigError::InvalidAddress { rule: label.to_string(), key });
        };

        let slots = args
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let context = || format!("{label}: {key}[{}]", i + 1);
                let expr = item
                    .to_expr()
                    .map_err(|source| ConfigError::InvalidExpression { context: context(), source })?;
                Slot::compile(expr, constants, context)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Template { address: address.clone(), slots })
    }
}

/// A mapping rule ready for resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    pub label: String,
    pub from: Option<Template>,
    pub to: Option<Template>,
    pub conditions: Vec<Expr>,
    pub mutations: Vec<(String, Expr)>,
}

impl CompiledRule {
    pub fn compile(label: impl Into<String>, spec: &RuleSpec, constants: &Constants) -> Result<Self, ConfigError> {
        let label = spec.name.clone().unwrap_or_else(|| label.into());

        let from = spec.from.as_deref().map(|items| Template::compile(&label, "from", items, constants)).transpose()?;
        let to = spec.to.as_deref().map(|items| Template::compile(&label, "to", items, constants)).transpose()?;

        let conditions = spec
            .conditions
            .iter()
            .enumerate()
            .map(|(i, source)| {
                Expr::parse(source)
                    .map_err(|err| ConfigError::InvalidExpression { context: format!("{label}: if[{i}]"), source: err })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mutations = spec
            .set
            .iter()
            .map(|(name, value)| {
                let expr = value.to_expr().map_err(|source| ConfigError::InvalidExpression {
                    context: format!("{label}: set.{name}"),
                    source,
                })?;
                Ok((name.clone(), expr))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(CompiledRule { label, from, to, conditions, mutations })
    }

    /// `(source, output)` templates for `direction`.
    pub fn templates(&self, direction: Direction) -> (Option<&Template>, Option<&Template>) {
        match direction {
            Direction::Forward => (self.from.as_ref(), self.to.as_ref()),
            Direction::Feedback => (self.to.as_ref(), self.from.as_ref()),
        }
    }
}

/// Compiled rule tables, one per control surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTables {
    tables: BTreeMap<String, Vec<CompiledRule>>,
}

impl RuleTables {
    pub fn compile(mappings: &BTreeMap<String, Vec<RuleSpec>>, constants: &Constants) -> Result<Self, ConfigError> {
        let mut tables = BTreeMap::new();
        for (surface, specs) in mappings {
            let rules = specs
                .iter()
                .enumerate()
                .map(|(i, spec)| CompiledRule::compile(format!("{surface}#{i}"), spec, constants))
                .collect::<Result<Vec<_>, _>>()?;
            tables.insert(surface.clone(), rules);
        }
        Ok(RuleTables { tables })
    }

    pub fn table(&self, surface: &str) -> Option<&[CompiledRule]> {
        self.tables.get(surface).map(Vec::as_slice)
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[CompiledRule])> {
        self.tables.iter().map(|(name, rules)| (name.as_str(), rules.as_slice()))
    }

    pub fn rule_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> TemplateValue {
        TemplateValue::Text(s.to_string())
    }

    fn constants() -> Constants {
        [("EQ_PLUGIN_IDX", 1.0), ("TRIM", 0.0)].into_iter().collect()
    }

    fn spec(from: Vec<TemplateValue>, to: Option<Vec<TemplateValue>>) -> RuleSpec {
        RuleSpec { from: Some(from), to, ..RuleSpec::default() }
    }

    #[test]
    fn classifies_slots_once() {
        let rule = CompiledRule::compile(
            "xtouch#2",
            &spec(
                vec![text("/control"), TemplateValue::Number(1.0), text("9+9"), text("c+9"), text("EQ_PLUGIN_IDX")],
                None,
            ),
            &constants(),
        )
        .unwrap();

        let slots = &rule.from.as_ref().unwrap().slots;
        assert!(matches!(slots[0], Slot::Constant { value, .. } if value == 1.0));
        assert!(matches!(slots[1], Slot::Constant { value, .. } if value == 18.0));
        assert!(matches!(&slots[2], Slot::Variable { variables, .. } if variables.contains("c")));
        assert!(matches!(slots[3], Slot::Constant { value, .. } if value == 1.0));
        assert_eq!(rule.label, "xtouch#2");
    }

    #[test]
    fn templates_swap_with_direction() {
        let rule = CompiledRule::compile(
            "r",
            &spec(vec![text("/a")], Some(vec![text("/b")])),
            &constants(),
        )
        .unwrap();
        let (src, out) = rule.templates(Direction::Forward);
        assert_eq!((src.unwrap().address.as_str(), out.unwrap().address.as_str()), ("/a", "/b"));
        let (src, out) = rule.templates(Direction::Feedback);
        assert_eq!((src.unwrap().address.as_str(), out.unwrap().address.as_str()), ("/b", "/a"));
    }

    #[test]
    fn named_rules_keep_their_name() {
        let mut s = spec(vec![text("/a")], None);
        s.name = Some("master fader".into());
        assert_eq!(CompiledRule::compile("xtouch#0", &s, &constants()).unwrap().label, "master fader");
    }

    #[test]
    fn rejects_bad_templates() {
        let missing = spec(vec![TemplateValue::Number(1.0)], None);
        assert!(matches!(
            CompiledRule::compile("r", &missing, &constants()),
            Err(ConfigError::InvalidAddress { key: "from", .. })
        ));

        let bad_expr = spec(vec![text("/a"), text("c +")], None);
        let err = CompiledRule::compile("r", &bad_expr, &constants());
        assert!(matches!(err, Err(ConfigError::InvalidExpression { .. })));

        let bad_constant = spec(vec![text("/a"), text("1 / 0")], None);
        assert!(matches!(
            CompiledRule::compile("r", &bad_constant, &constants()),
            Err(ConfigError::InvalidExpression { .. })
        ));
    }

    #[test]
    fn tables_keep_declaration_order() {
        let mappings = BTreeMap::from([(
            "xtouch".to_string(),
            vec![spec(vec![text("/first")], None), spec(vec![text("/second")], None)],
        )]);
        let tables = RuleTables::compile(&mappings, &constants()).unwrap();
        let table = tables.table("xtouch").unwrap();
        assert_eq!(table[0].label, "xtouch#0");
        assert_eq!(table[1].from.as_ref().unwrap().address, "/second");
        assert_eq!(tables.rule_count(), 2);
        assert!(tables.table("other").is_none());
    }
}
