use std::collections::BTreeMap;

use crate::config::{BridgeConfig, HostPort};
use crate::engine::{self, DispatchReport, Environment, RuleTables};
use crate::error::ConfigError;
use crate::expr::Constants;
use crate::feedback::SurfaceSetup;
use crate::plugin::PluginCatalog;
use crate::{Inbound, Outbound, Peer};

/// A configured bridge: compiled rule tables plus the live environment.
///
/// `Bridge` does no I/O. Feed it decoded messages with [`Bridge::dispatch`]
/// and send what comes back; the binary does exactly that over UDP.
///
/// # Example
/// ```
/// use faderlink::{Bridge, Inbound, Message, Peer, Value};
///
/// let mut bridge = Bridge::builtin().unwrap();
/// let fader = Message::new("/control", vec![Value::Int(1), Value::Int(3), Value::Int(127)]);
/// let report = bridge.dispatch(&Inbound::from_surface("xtouch", fader));
/// assert_eq!(report.outputs.len(), 1);
/// assert_eq!(report.outputs[0].destination, Peer::Automation);
/// assert_eq!(report.outputs[0].message, Message::new("/strip/fader", vec![Value::Int(3), Value::Int(1)]));
/// ```
#[derive(Debug)]
pub struct Bridge {
    tables: RuleTables,
    env: Environment,
    setup: SurfaceSetup,
    endpoint: Option<HostPort>,
    listen: HostPort,
    peers: BTreeMap<String, HostPort>,
    plugins: PluginCatalog,
}

impl Bridge {
    /// Compile `config` and initialise every variable to its default.
    pub fn new(config: BridgeConfig) -> Result<Self, ConfigError> {
        let constants: Constants = config.constants.iter().map(|(k, v)| (k.clone(), *v)).collect();

        let mut variables = BTreeMap::new();
        for (name, default) in &config.variables {
            if constants.contains(name) {
                return Err(ConfigError::VariableShadowsConstant { name: name.clone() });
            }
            let invalid = |source| ConfigError::InvalidExpression { context: format!("variables.{name}"), source };
            let value = default.to_expr().and_then(|expr| expr.evaluate(&constants)).map_err(invalid)?;
            variables.insert(name.clone(), value);
        }

        let tables = RuleTables::compile(&config.mappings, &constants)?;
        let setup = config.surface.resolve()?;
        let endpoint = config.send_endpoint()?;
        let listen = config.listen_endpoint()?;
        let peers = config.peer_endpoints()?;

        if endpoint.is_none() {
            tracing::warn!("\"send\" option not set; automation output has nowhere to go");
        }
        for surface in peers.keys().filter(|name| tables.table(name).is_none()) {
            tracing::warn!(surface = %surface, "peer has no mapping table");
        }
        tracing::debug!(
            surfaces = tables.surfaces().count(),
            rules = tables.rule_count(),
            constants = constants.len(),
            variables = variables.len(),
            "bridge configured"
        );

        Ok(Bridge {
            tables,
            env: Environment::new(constants, variables),
            setup,
            endpoint,
            listen,
            peers,
            plugins: PluginCatalog::new(),
        })
    }

    /// A bridge running the built-in X-Touch configuration.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::new(BridgeConfig::builtin()?)
    }

    /// Swap in a new configuration.
    ///
    /// All or nothing: on error the running tables and environment are left
    /// as they were. On success variables restart from their defaults.
    pub fn reload(&mut self, config: BridgeConfig) -> Result<(), ConfigError> {
        let next = Self::new(config)?;
        let plugins = std::mem::take(&mut self.plugins);
        *self = Bridge { plugins, ..next };
        tracing::info!(rules = self.tables.rule_count(), "configuration reloaded");
        Ok(())
    }

    /// The `/set_surface` registration to send once at startup.
    pub fn handshake(&self) -> Outbound {
        Outbound { destination: Peer::Automation, message: self.setup.handshake() }
    }

    /// Ask the console to describe a plugin; the listing is logged once the
    /// descriptor rows have arrived through [`Bridge::dispatch`].
    pub fn describe_plugin(&mut self, strip: i64, plugin: i64) -> Outbound {
        Outbound { destination: Peer::Automation, message: self.plugins.request(strip, plugin) }
    }

    /// Run one message through the rule tables.
    pub fn dispatch(&mut self, inbound: &Inbound) -> DispatchReport {
        if inbound.origin == Peer::Automation {
            if let Some(listing) = self.plugins.observe(&inbound.message) {
                tracing::info!(
                    strip = listing.strip,
                    plugin = listing.plugin,
                    "plugin parameters:\n{}",
                    listing.lines.join("\n")
                );
            }
        }
        engine::dispatch(&self.tables, &mut self.env, inbound)
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn tables(&self) -> &RuleTables {
        &self.tables
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &str> {
        self.tables.surfaces()
    }

    pub fn setup(&self) -> &SurfaceSetup {
        &self.setup
    }

    /// The console's automation endpoint, if configured.
    pub fn endpoint(&self) -> Option<&HostPort> {
        self.endpoint.as_ref()
    }

    pub fn listen(&self) -> &HostPort {
        &self.listen
    }

    pub fn peers(&self) -> &BTreeMap<String, HostPort> {
        &self.peers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TemplateValue;
    use crate::{Message, Value};

    fn config(source: &str) -> BridgeConfig {
        BridgeConfig::from_toml_str(source).unwrap()
    }

    #[test]
    fn variable_defaults_may_name_constants() {
        let bridge = Bridge::new(config(
            r#"
            [constants]
            PAN = 1
            [variables]
            channel_mode = "PAN"
            detail_mode = 3
            "#,
        ))
        .unwrap();
        assert_eq!(bridge.environment().get("channel_mode"), Some(1.0));
        assert_eq!(bridge.environment().get("detail_mode"), Some(3.0));
        assert_eq!(bridge.endpoint(), None);
        assert_eq!(bridge.listen().port, 8000);
    }

    #[test]
    fn rejects_variable_shadowing_constant() {
        let mut cfg = config("[constants]\nPAN = 1\n");
        cfg.variables.insert("PAN".into(), TemplateValue::Number(0.0));
        assert!(matches!(Bridge::new(cfg), Err(ConfigError::VariableShadowsConstant { .. })));
    }

    #[test]
    fn rejects_bad_rule_expression() {
        let err = Bridge::new(config(
            r#"
            [[mappings.xtouch]]
            from = ["/control", 1, "c +", "v"]
            "#,
        ))
        .unwrap_err();
        match err {
            ConfigError::InvalidExpression { context, .. } => assert!(context.starts_with("xtouch#0")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn failed_reload_keeps_running_state() {
        let mut bridge = Bridge::new(config("[variables]\nmode = 1\n")).unwrap();
        assert!(bridge.reload(config("[variables]\nmode = \"nope\"\n")).is_err());
        assert_eq!(bridge.environment().get("mode"), Some(1.0));
        bridge.reload(config("[variables]\nmode = 2\n")).unwrap();
        assert_eq!(bridge.environment().get("mode"), Some(2.0));
    }

    #[test]
    fn handshake_goes_to_automation() {
        let bridge = Bridge::new(config("[surface]\nbank_size = 16\n")).unwrap();
        let out = bridge.handshake();
        assert_eq!(out.destination, Peer::Automation);
        assert_eq!(out.message.address, "/set_surface");
        assert_eq!(out.message.args[0], Value::Int(16));
    }

    #[test]
    fn plugin_descriptors_pass_through_dispatch() {
        let mut bridge = Bridge::new(BridgeConfig::default()).unwrap();
        let request = bridge.describe_plugin(2, 1);
        assert_eq!(request.message.address, "/strip/plugin/descriptor");
        let end = Message::new("/strip/plugin/descriptor_end", vec![Value::Int(2), Value::Int(1)]);
        assert!(bridge.dispatch(&Inbound::from_automation(end)).is_empty());
        assert!(!bridge.plugins.is_collecting());
    }
}
