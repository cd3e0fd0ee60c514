//! # faderlink
//!
//! A bridge between control surfaces (faders, rotaries, buttons) and a mixing
//! console's OSC automation protocol. Both directions are driven by one rule
//! table: every rule declares how a surface message (`from`) maps to a console
//! message (`to`), and the feedback direction falls out of solving the same
//! templates backwards.
//!
//! ```text
//! surface ── /control 1 12 64 ──▶ Bridge::dispatch ──▶ /strip/trimdB 3 0.157
//! console ── /strip/fader 3 0.5 ─▶ Bridge::dispatch ──▶ /control 1 3 63.5
//! ```
//!
//! Most callers only need [`Bridge`], [`Inbound`] and [`DispatchReport`].

#[macro_use]
mod macros;
mod api;
pub mod config;
mod engine;
pub mod error;
pub mod expr;
pub mod feedback;
pub mod osc;
pub mod plugin;

use std::fmt;

pub use api::Bridge;
pub use engine::{
    Abort, CompiledRule, DispatchReport, Environment, Fired, RuleTables, Severity, Slot, Template, WorkingScope,
    evaluate, resolve,
};

// --- Messages ---------------------------------------------------------------

/// A single typed message argument.
///
/// Numbers keep the distinction between integers and floats because the
/// surface side (MIDI translated to OSC) is integer-valued, while the console
/// side mostly speaks normalised floats.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Blob(Vec<u8>),
    Bool(bool),
}

impl Value {
    /// Numeric view of the argument, if it has one.
    ///
    /// Booleans count as `1`/`0`; strings and blobs never do.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Str(_) | Value::Blob(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Type a computed number the way the transport expects it: integral
    /// values that fit an `i32` go out as integers, everything else as floats.
    pub fn from_number(value: f64) -> Self {
        if value.fract() == 0.0 && value >= i32::MIN as f64 && value <= i32::MAX as f64 {
            Value::Int(value as i64)
        } else {
            Value::Float(value)
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Blob(b) => write!(f, "<blob:{}>", b.len()),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// An address plus its ordered arguments. Immutable once received.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub address: String,
    pub args: Vec<Value>,
}

impl Message {
    pub fn new(address: impl Into<String>, args: Vec<Value>) -> Self {
        Message { address: address.into(), args }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Which side of the bridge a message comes from or goes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Peer {
    /// The mixing console's automation endpoint.
    Automation,
    /// A named control surface; the name selects its rule table.
    Surface(String),
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Peer::Automation => write!(f, "automation"),
            Peer::Surface(name) => write!(f, "surface:{name}"),
        }
    }
}

/// A message tagged with where it arrived from.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub origin: Peer,
    pub message: Message,
}

impl Inbound {
    pub fn from_surface(surface: impl Into<String>, message: Message) -> Self {
        Inbound { origin: Peer::Surface(surface.into()), message }
    }

    pub fn from_automation(message: Message) -> Self {
        Inbound { origin: Peer::Automation, message }
    }
}

/// A message tagged with where it must be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub destination: Peer,
    pub message: Message,
}

/// Direction a rule is applied in.
///
/// `Forward` reads the rule's `from` template and writes its `to` template;
/// `Feedback` does the reverse and never mutates shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Feedback,
}

impl Direction {
    /// Direction implied by a message's origin.
    pub fn of(origin: &Peer) -> Self {
        match origin {
            Peer::Surface(_) => Direction::Forward,
            Peer::Automation => Direction::Feedback,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Feedback => write!(f, "feedback"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_typed_for_the_transport() {
        assert_eq!(Value::from_number(3.0), Value::Int(3));
        assert_eq!(Value::from_number(-20.0), Value::Int(-20));
        assert_eq!(Value::from_number(0.5), Value::Float(0.5));
        assert_eq!(Value::from_number(1e12), Value::Float(1e12));
    }

    #[test]
    fn numeric_views() {
        assert_eq!(Value::Int(127).as_f64(), Some(127.0));
        assert_eq!(Value::Bool(true).as_f64(), Some(1.0));
        assert_eq!(Value::Str("x".into()).as_f64(), None);
        assert_eq!(Value::Float(2.0).as_i64(), Some(2));
        assert_eq!(Value::Float(2.5).as_i64(), None);
    }

    #[test]
    fn direction_follows_origin() {
        assert_eq!(Direction::of(&Peer::Surface("xtouch".into())), Direction::Forward);
        assert_eq!(Direction::of(&Peer::Automation), Direction::Feedback);
    }

    #[test]
    fn message_display_lists_args() {
        let msg = Message::new("/strip/fader", vec![Value::Int(3), Value::Float(0.5)]);
        assert_eq!(msg.to_string(), "/strip/fader 3 0.5");
    }
}
