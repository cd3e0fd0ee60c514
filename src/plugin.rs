//! Plugin parameter listings.
//!
//! Plugin parameters are addressed by their index among the *controllable*
//! parameters, which is not the id the console reports. To write a mapping
//! for a plugin you first need that table:
//!
//! ```text
//! bridge ── /strip/plugin/descriptor 3 1 ──▶ console
//! console ── /strip/plugin/descriptor 3 1 <param> <name> <flags> <type> <min> <max> <unit> …
//!            (one per parameter)
//! console ── /strip/plugin/descriptor_end 3 1 ──▶ listing
//!
//! id 1, idx 1: Gain, -20-20, unit dB, type float, flags 128
//! id 2, not_ctrlable: Latency, 0-1000, unit samples, type int, flags 4
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::{Message, Value};

/// Descriptor flag marking a parameter as controllable.
const CONTROLLABLE: i64 = 1 << 7;

#[derive(Debug, Clone, PartialEq)]
struct Parameter {
    name: Value,
    flags: i64,
    data_type: Value,
    min: Value,
    max: Value,
    unit: Value,
}

/// One described plugin, ready to print.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginListing {
    pub strip: i64,
    pub plugin: i64,
    pub lines: Vec<String>,
}

impl fmt::Display for PluginListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "strip {} plugin {}", self.strip, self.plugin)?;
        for line in &self.lines {
            write!(f, "\n  {line}")?;
        }
        Ok(())
    }
}

/// Collects descriptor rows for the plugins that were asked about.
#[derive(Debug, Default)]
pub struct PluginCatalog {
    pending: BTreeMap<(i64, i64), BTreeMap<i64, Parameter>>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start collecting for `strip`/`plugin` (both 1-based) and return the
    /// request to send to the console.
    pub fn request(&mut self, strip: i64, plugin: i64) -> Message {
        self.pending.insert((strip, plugin), BTreeMap::new());
        Message::new("/strip/plugin/descriptor", vec![Value::Int(strip), Value::Int(plugin)])
    }

    pub fn is_collecting(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Feed a console message. Returns the listing once the matching
    /// `descriptor_end` arrives; everything else yields `None`.
    pub fn observe(&mut self, message: &Message) -> Option<PluginListing> {
        match message.address.as_str() {
            "/strip/plugin/descriptor" => {
                let [strip, plugin, param, name, flags, data_type, min, max, unit, ..] = message.args.as_slice() else {
                    tracing::debug!(message = %message, "short plugin descriptor row");
                    return None;
                };
                let key = (strip.as_i64()?, plugin.as_i64()?);
                let Some(params) = self.pending.get_mut(&key) else {
                    tracing::trace!(strip = key.0, plugin = key.1, "descriptor for a plugin nobody asked about");
                    return None;
                };
                let parameter = Parameter {
                    name: name.clone(),
                    flags: flags.as_i64().unwrap_or(0),
                    data_type: data_type.clone(),
                    min: min.clone(),
                    max: max.clone(),
                    unit: unit.clone(),
                };
                params.insert(param.as_i64()?, parameter);
                None
            }
            "/strip/plugin/descriptor_end" => {
                let [strip, plugin, ..] = message.args.as_slice() else { return None };
                let (strip, plugin) = (strip.as_i64()?, plugin.as_i64()?);
                let params = self.pending.remove(&(strip, plugin))?;
                Some(PluginListing { strip, plugin, lines: listing_lines(&params) })
            }
            _ => None,
        }
    }
}

fn listing_lines(params: &BTreeMap<i64, Parameter>) -> Vec<String> {
    let mut idx = 1;
    params
        .iter()
        .map(|(id, p)| {
            let slot = if p.flags & CONTROLLABLE != 0 {
                idx += 1;
                format!("idx {}", idx - 1)
            } else {
                "not_ctrlable".to_string()
            };
            format!(
                "id {id}, {slot}: {}, {}-{}, unit {}, type {}, flags {}",
                p.name, p.min, p.max, p.unit, p.data_type, p.flags
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(param: i64, name: &str, flags: i64) -> Message {
        Message::new(
            "/strip/plugin/descriptor",
            vec![
                Value::Int(3),
                Value::Int(1),
                Value::Int(param),
                Value::Str(name.into()),
                Value::Int(flags),
                Value::Str("float".into()),
                Value::Float(-20.0),
                Value::Float(20.5),
                Value::Str("dB".into()),
                Value::Int(0),
            ],
        )
    }

    #[test]
    fn lists_controllable_indices() {
        let mut catalog = PluginCatalog::new();
        let request = catalog.request(3, 1);
        assert_eq!(request, Message::new("/strip/plugin/descriptor", vec![Value::Int(3), Value::Int(1)]));
        assert!(catalog.is_collecting());

        // Out of order on purpose: the listing is ordered by id.
        assert_eq!(catalog.observe(&row(3, "Freq", 128)), None);
        assert_eq!(catalog.observe(&row(1, "Gain", 128)), None);
        assert_eq!(catalog.observe(&row(2, "Latency", 4)), None);

        let end = Message::new("/strip/plugin/descriptor_end", vec![Value::Int(3), Value::Int(1)]);
        let listing = catalog.observe(&end).unwrap();
        assert_eq!((listing.strip, listing.plugin), (3, 1));
        assert_eq!(
            listing.lines,
            vec![
                "id 1, idx 1: Gain, -20-20.5, unit dB, type float, flags 128",
                "id 2, not_ctrlable: Latency, -20-20.5, unit dB, type float, flags 4",
                "id 3, idx 2: Freq, -20-20.5, unit dB, type float, flags 128",
            ]
        );
        assert!(!catalog.is_collecting());
    }

    #[test]
    fn ignores_unrequested_and_unrelated_messages() {
        let mut catalog = PluginCatalog::new();
        assert_eq!(catalog.observe(&row(1, "Gain", 128)), None);
        let end = Message::new("/strip/plugin/descriptor_end", vec![Value::Int(3), Value::Int(1)]);
        assert_eq!(catalog.observe(&end), None);
        assert_eq!(catalog.observe(&Message::new("/strip/fader", vec![Value::Int(1), Value::Float(0.5)])), None);
    }
}
