//! End-to-end behaviour of the bridge through its public API, mostly against
//! the built-in X-Touch configuration.

use std::io::Write;

use faderlink::config::BridgeConfig;
use faderlink::error::ConfigError;
use faderlink::{Bridge, Inbound, Message, Outbound, Peer, Value};

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

fn from_xtouch(address: &str, args: &[i64]) -> Inbound {
    Inbound::from_surface("xtouch", Message::new(address, ints(args)))
}

fn to_automation(address: &str, args: Vec<Value>) -> Outbound {
    Outbound { destination: Peer::Automation, message: Message::new(address, args) }
}

#[test]
fn rotary_follows_channel_mode() {
    let mut bridge = Bridge::builtin().unwrap();

    let report = bridge.dispatch(&from_xtouch("/control", &[1, 12, 64]));
    assert_eq!(report.outputs.len(), 1);
    let out = &report.outputs[0];
    assert_eq!(out.destination, Peer::Automation);
    assert_eq!(out.message.address, "/strip/trimdB");
    assert_eq!(out.message.args[0], Value::Int(3));
    let db = out.message.args[1].as_f64().unwrap();
    assert!((db - 20.0 / 127.0).abs() < 1e-9, "trim was {db}");

    // Rotary 11 push switches to pan; no output of its own.
    let report = bridge.dispatch(&from_xtouch("/note", &[1, 10, 127]));
    assert!(report.is_empty());
    assert_eq!(bridge.environment().get("channel_mode"), Some(1.0));

    let report = bridge.dispatch(&from_xtouch("/control", &[1, 12, 127]));
    assert_eq!(report.outputs, vec![to_automation("/strip/pan_stereo_position", ints(&[3, 1]))]);
}

#[test]
fn mode_button_retargets_eq_rotaries() {
    let mut bridge = Bridge::builtin().unwrap();

    let report = bridge.dispatch(&from_xtouch("/note", &[1, 52, 127]));
    assert!(report.is_empty());
    assert_eq!(report.rules_fired, 1);
    assert_eq!(report.mutations, 1);
    assert_eq!(bridge.environment().get("detail_mode"), Some(2.0));

    let report = bridge.dispatch(&from_xtouch("/control", &[1, 18, 100]));
    assert_eq!(
        report.outputs,
        vec![to_automation(
            "/select/plugin/parameter",
            vec![Value::Int(1), Value::Int(25), Value::Float(100.0 / 127.0)]
        )]
    );
}

#[test]
fn one_message_can_fire_several_rules() {
    let mut bridge = Bridge::builtin().unwrap();
    bridge.dispatch(&from_xtouch("/note", &[1, 10, 127]));
    assert_eq!(bridge.environment().get("channel_mode"), Some(1.0));

    // Note 8 toggles EQ band 1 and also switches the rotaries back to trim.
    let report = bridge.dispatch(&from_xtouch("/note", &[1, 8, 127]));
    assert_eq!(report.rules_fired, 2);
    assert_eq!(
        report.outputs,
        vec![to_automation("/select/plugin/parameter", vec![Value::Int(1), Value::Int(14), Value::Float(0.5)])]
    );
    assert_eq!(bridge.environment().get("channel_mode"), Some(0.0));
}

#[test]
fn console_feedback_moves_the_fader() {
    let mut bridge = Bridge::builtin().unwrap();
    let inbound = Inbound::from_automation(Message::new("/strip/fader", vec![Value::Int(3), Value::Float(0.5)]));
    let report = bridge.dispatch(&inbound);
    assert_eq!(
        report.outputs,
        vec![Outbound {
            destination: Peer::Surface("xtouch".into()),
            message: Message::new("/control", vec![Value::Int(1), Value::Int(3), Value::Float(63.5)]),
        }]
    );
}

#[test]
fn trim_feedback_inverts_the_scaling() {
    let mut bridge = Bridge::builtin().unwrap();
    let inbound = Inbound::from_automation(Message::new("/strip/trimdB", vec![Value::Int(2), Value::Float(0.0)]));
    let report = bridge.dispatch(&inbound);
    assert_eq!(report.outputs.len(), 1);
    let expected = Message::new("/control", vec![Value::Int(1), Value::Int(11), Value::Float(63.5)]);
    assert_eq!(report.outputs[0].message, expected);
}

#[test]
fn feedback_never_changes_modes() {
    let mut bridge = Bridge::builtin().unwrap();
    let before = bridge.environment().snapshot();

    for address in ["/note", "/strip/fader", "/select/plugin/parameter"] {
        bridge.dispatch(&Inbound::from_automation(Message::new(address, ints(&[1, 52, 127]))));
    }

    assert_eq!(bridge.environment().snapshot(), before);
}

#[test]
fn wrong_arity_is_skipped_by_every_rule() {
    let mut bridge = Bridge::builtin().unwrap();
    let report = bridge.dispatch(&from_xtouch("/control", &[1, 3]));
    assert!(report.is_empty());
    assert_eq!(report.rules_fired, 0);
    assert_eq!(report.rules_considered, bridge.tables().table("xtouch").unwrap().len());
}

#[test]
fn unknown_surface_is_ignored() {
    let mut bridge = Bridge::builtin().unwrap();
    let report = bridge.dispatch(&Inbound::from_surface("launchpad", Message::new("/control", ints(&[1, 3, 64]))));
    assert!(report.is_empty());
    assert_eq!(report.rules_considered, 0);
}

#[test]
fn reload_resets_variables() {
    let mut bridge = Bridge::builtin().unwrap();
    bridge.dispatch(&from_xtouch("/note", &[1, 49, 127]));
    assert_eq!(bridge.environment().get("detail_mode"), Some(0.0));

    bridge.reload(BridgeConfig::builtin().unwrap()).unwrap();
    assert_eq!(bridge.environment().get("detail_mode"), Some(1.0));
}

const TWO_SURFACES: &str = r#"
send = "127.0.0.1:3819"
listen = "127.0.0.1:8000"

[peers]
korg = "127.0.0.1:9002"
xtouch = "127.0.0.1:9001"

[[mappings.xtouch]]
from = ["/control", 1, "c", "v"]
to = ["/strip/fader", "c", "v / 127"]

[[mappings.korg]]
name = "nano fader"
from = ["/cc", "c - 1", "v"]
to = ["/strip/fader", "c", "v / 127"]
"#;

#[test]
fn loads_config_from_file_and_fans_out_feedback() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(TWO_SURFACES.as_bytes()).unwrap();

    let mut bridge = Bridge::new(BridgeConfig::load(file.path()).unwrap()).unwrap();
    assert_eq!(bridge.surfaces().collect::<Vec<_>>(), vec!["korg", "xtouch"]);
    assert_eq!(bridge.endpoint().unwrap().port, 3819);
    assert_eq!(bridge.peers()["korg"].port, 9002);

    let fader = Message::new("/strip/fader", vec![Value::Int(2), Value::Float(1.0)]);
    let report = bridge.dispatch(&Inbound::from_automation(fader));
    assert_eq!(
        report.outputs,
        vec![
            Outbound {
                destination: Peer::Surface("korg".into()),
                message: Message::new("/cc", ints(&[1, 127])),
            },
            Outbound {
                destination: Peer::Surface("xtouch".into()),
                message: Message::new("/control", ints(&[1, 2, 127])),
            },
        ]
    );
}

#[test]
fn missing_config_file_is_an_io_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = BridgeConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn handshake_matches_surface_section() {
    let bridge = Bridge::builtin().unwrap();
    let out = bridge.handshake();
    assert_eq!(out.destination, Peer::Automation);
    assert_eq!(out.message, Message::new("/set_surface", ints(&[8, 159, 8211, 2, 8, 8])));
}
