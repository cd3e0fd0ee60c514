//! Bridge configuration.
//!
//! Configuration is TOML. Rule templates are arrays that start with an
//! address string followed by numbers or expression strings, exactly as they
//! appear on the wire:
//!
//! ```toml
//! send = "127.0.0.1:3819"
//!
//! [constants]
//! TRIM = 0
//! PAN = 1
//!
//! [variables]
//! channel_mode = "TRIM"
//!
//! [peers]
//! xtouch = "127.0.0.1:9001"
//!
//! [[mappings.xtouch]]
//! from = ["/control", 1, "c+9", "v * 127"]
//! to = ["/strip/trimdB", "c", "v * 40 - 20"]
//! if = ["c => 1", "c <= 8", "channel_mode == TRIM"]
//!
//! [[mappings.xtouch]]
//! from = ["/note", 1, 10, 127]
//! set = { channel_mode = "PAN" }
//! ```
//!
//! A complete X-Touch configuration ships with the crate and is used when no
//! file is given (see [`BridgeConfig::builtin`]).

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::{ConfigError, ExprError};
use crate::expr::Expr;
use crate::feedback::{FeedbackFlags, SurfaceSetup};

/// The configuration shipped with the crate.
pub const BUILTIN_CONFIG: &str = include_str!("../config/xtouch.toml");

static BUILTIN: Lazy<Result<BridgeConfig, toml::de::Error>> = Lazy::new(|| toml::from_str(BUILTIN_CONFIG));

const DEFAULT_LISTEN: &str = "0.0.0.0:8000";

/// A template item: a literal number or an expression string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TemplateValue {
    Number(f64),
    Text(String),
}

impl TemplateValue {
    pub fn to_expr(&self) -> Result<Expr, ExprError> {
        match self {
            TemplateValue::Number(value) => Ok(Expr::number(*value)),
            TemplateValue::Text(source) => Expr::parse(source),
        }
    }
}

/// One mapping rule as written in configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    /// Optional label used in logs instead of `<surface>#<index>`.
    #[serde(default)]
    pub name: Option<String>,
    /// Surface-side template.
    #[serde(default)]
    pub from: Option<Vec<TemplateValue>>,
    /// Console-side template.
    #[serde(default)]
    pub to: Option<Vec<TemplateValue>>,
    /// Guards; all must be non-zero for the rule to fire.
    #[serde(default, rename = "if")]
    pub conditions: Vec<String>,
    /// Variable writes, applied on the forward direction only.
    #[serde(default)]
    pub set: BTreeMap<String, TemplateValue>,
}

/// Overrides for the `/set_surface` handshake.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurfaceSection {
    pub bank_size: Option<u32>,
    pub strip_types: Option<u32>,
    /// Feedback flag names, e.g. `["STRIP_BUTTONS", "MASTER"]`.
    pub feedback: Option<Vec<String>>,
    pub fader_mode: Option<u32>,
    pub send_page_size: Option<u32>,
    pub plugin_page_size: Option<u32>,
}

impl SurfaceSection {
    pub fn resolve(&self) -> Result<SurfaceSetup, ConfigError> {
        let mut setup = SurfaceSetup::default();
        if let Some(v) = self.bank_size {
            setup.bank_size = v;
        }
        if let Some(v) = self.strip_types {
            setup.strip_types = v;
        }
        if let Some(names) = &self.feedback {
            setup.feedback = names.iter().try_fold(FeedbackFlags::empty(), |acc, name| {
                FeedbackFlags::from_name(name)
                    .map(|flag| acc | flag)
                    .ok_or_else(|| ConfigError::UnknownFeedbackFlag { name: name.clone() })
            })?;
        }
        if let Some(v) = self.fader_mode {
            setup.fader_mode = v;
        }
        if let Some(v) = self.send_page_size {
            setup.send_page_size = v;
        }
        if let Some(v) = self.plugin_page_size {
            setup.plugin_page_size = v;
        }
        Ok(setup)
    }
}

/// A `host:port` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl HostPort {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidEndpoint { value: value.to_string() };
        let caps = regex!(r"^\s*(?P<host>[^\s:]+|\[[0-9A-Fa-f:.]+\]):(?P<port>\d{1,5})\s*$")
            .captures(value)
            .ok_or_else(invalid)?;
        let port = caps["port"].parse::<u16>().map_err(|_| invalid())?;
        let host = caps["host"].trim_start_matches('[').trim_end_matches(']').to_string();
        Ok(HostPort { host, port })
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Console automation endpoint, `host:port`.
    #[serde(default)]
    pub send: Option<String>,
    /// Local address to receive on, `host:port`.
    #[serde(default)]
    pub listen: Option<String>,
    /// Named constants usable in every expression.
    #[serde(default)]
    pub constants: BTreeMap<String, f64>,
    /// Global variables and their defaults (numbers or expressions over constants).
    #[serde(default)]
    pub variables: BTreeMap<String, TemplateValue>,
    /// Handshake overrides.
    #[serde(default)]
    pub surface: SurfaceSection,
    /// Where each surface sends from and receives at, `host:port`.
    #[serde(default)]
    pub peers: BTreeMap<String, String>,
    /// Rule tables keyed by surface name.
    #[serde(default)]
    pub mappings: BTreeMap<String, Vec<RuleSpec>>,
}

impl BridgeConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|source| ConfigError::Parse { source })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
        Self::from_toml_str(&source)
    }

    /// The X-Touch configuration shipped with the crate.
    pub fn builtin() -> Result<Self, ConfigError> {
        BUILTIN.clone().map_err(|source| ConfigError::Parse { source })
    }

    /// The automation endpoint, if configured.
    pub fn send_endpoint(&self) -> Result<Option<HostPort>, ConfigError> {
        self.send.as_deref().map(HostPort::parse).transpose()
    }

    pub fn listen_endpoint(&self) -> Result<HostPort, ConfigError> {
        HostPort::parse(self.listen.as_deref().unwrap_or(DEFAULT_LISTEN))
    }

    pub fn peer_endpoints(&self) -> Result<BTreeMap<String, HostPort>, ConfigError> {
        self.peers.iter().map(|(name, value)| Ok((name.clone(), HostPort::parse(value)?))).collect()
    }
}
