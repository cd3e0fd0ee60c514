//! Shared variable state.
//!
//! The [`Environment`] is the only state that survives from one dispatch to
//! the next. It holds the fixed constant table and the mutable variables
//! (`channel_mode`, `detail_mode`, ...). Variables are created once from the
//! configured defaults; afterwards only firing rules' `set` directives write
//! to them, and never to a name that was not declared up front.
//!
//! Each rule evaluation layers its solved bindings on top in a
//! [`WorkingScope`], which is dropped as soon as that evaluation ends.

use std::collections::BTreeMap;

use crate::expr::{Constants, Scope};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    constants: Constants,
    variables: BTreeMap<String, f64>,
}

impl Environment {
    pub fn new(constants: Constants, variables: BTreeMap<String, f64>) -> Self {
        Environment { constants, variables }
    }

    pub fn constants(&self) -> &Constants {
        &self.constants
    }

    /// Current value of a variable (constants are not variables).
    pub fn get(&self, name: &str) -> Option<f64> {
        self.variables.get(name).copied()
    }

    /// True if `name` is a declared variable.
    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, f64)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Owned copy of every variable's current value.
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        self.variables.clone()
    }

    /// Overwrite a declared variable. Returns `false`, leaving the store
    /// untouched, when `name` was never declared.
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        match self.variables.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Apply a batch of writes whose targets were already checked.
    pub(crate) fn commit(&mut self, writes: Vec<(String, f64)>) {
        for (name, value) in writes {
            let applied = self.set(&name, value);
            debug_assert!(applied, "unchecked write to `{name}`");
        }
    }
}

impl Scope for Environment {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).or_else(|| self.constants.get(name))
    }
}

/// The persistent environment plus one resolution's solved bindings.
///
/// Lookup order: solved bindings, then variables, then constants.
#[derive(Debug, Clone, Copy)]
pub struct WorkingScope<'a> {
    env: &'a Environment,
    bindings: &'a BTreeMap<String, f64>,
}

impl<'a> WorkingScope<'a> {
    pub fn new(env: &'a Environment, bindings: &'a BTreeMap<String, f64>) -> Self {
        WorkingScope { env, bindings }
    }
}

impl Scope for WorkingScope<'_> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.bindings.get(name).copied().or_else(|| self.env.lookup(name))
    }
}
