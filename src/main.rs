//! faderlink CLI: bridge control surfaces to a mixing console over OSC.

mod summary;

use std::collections::BTreeMap;
use std::io::{self, IsTerminal};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;

use faderlink::config::{BridgeConfig, HostPort};
use faderlink::error::{BridgeError, ConfigError};
use faderlink::{Bridge, Inbound, Outbound, Peer, osc};

/// Largest datagram accepted.
const MAX_PACKET: usize = 64 * 1024;

#[derive(Parser)]
#[command(
    name = "faderlink",
    version,
    about = "Bidirectional OSC bridge between control surfaces and a mixing console"
)]
struct Cli {
    /// Configuration file (TOML). Defaults to the built-in X-Touch mapping.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register with the console and bridge messages until interrupted.
    Run {
        /// Override the automation endpoint (`host:port`).
        #[arg(long)]
        send: Option<String>,

        /// Override the local listen address (`host:port`).
        #[arg(long)]
        listen: Option<String>,

        /// Log the parameter table of a plugin, as `STRIP:PLUGIN` (1-based).
        #[arg(long, value_parser = parse_plugin_target)]
        describe_plugin: Option<PluginTarget>,
    },

    /// Load and compile the configuration, then print a summary.
    Check,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(miette::MietteHandlerOpts::new().terminal_links(true).unicode(true).context_lines(3).build())
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let (source, mut config) = match &cli.config {
        Some(path) => (path.display().to_string(), BridgeConfig::load(path)?),
        None => ("<built-in xtouch>".to_string(), BridgeConfig::builtin()?),
    };

    match cli.command {
        Commands::Run { send, listen, describe_plugin } => {
            if send.is_some() {
                config.send = send;
            }
            if listen.is_some() {
                config.listen = listen;
            }
            tracing::info!(config = %source, "starting bridge");
            let bridge = Bridge::new(config)?;
            run(bridge, describe_plugin)?;
        }
        Commands::Check => {
            let bridge = Bridge::new(config)?;
            summary::print_check(&source, &bridge, io::stdout().is_terminal());
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct PluginTarget {
    strip: i64,
    plugin: i64,
}

fn parse_plugin_target(value: &str) -> std::result::Result<PluginTarget, String> {
    let caps = faderlink::regex!(r"^(\d+):(\d+)$")
        .captures(value)
        .ok_or_else(|| format!("expected STRIP:PLUGIN, got '{value}'"))?;
    let strip = caps[1].parse().map_err(|_| format!("invalid strip in '{value}'"))?;
    let plugin = caps[2].parse().map_err(|_| format!("invalid plugin in '{value}'"))?;
    Ok(PluginTarget { strip, plugin })
}

/// Where messages come from and go to, resolved once at startup.
struct Routes {
    automation: SocketAddr,
    surfaces: BTreeMap<String, SocketAddr>,
}

impl Routes {
    fn resolve(bridge: &Bridge) -> std::result::Result<Self, BridgeError> {
        let endpoint = bridge.endpoint().ok_or(ConfigError::MissingSend)?;
        let automation = socket_addr(endpoint)?;
        let surfaces = bridge
            .peers()
            .iter()
            .map(|(name, peer)| Ok((name.clone(), socket_addr(peer)?)))
            .collect::<std::result::Result<_, BridgeError>>()?;
        Ok(Routes { automation, surfaces })
    }

    fn origin(&self, from: SocketAddr) -> Option<Peer> {
        if from == self.automation {
            return Some(Peer::Automation);
        }
        self.surfaces.iter().find(|(_, addr)| **addr == from).map(|(name, _)| Peer::Surface(name.clone()))
    }

    fn address(&self, destination: &Peer) -> Option<SocketAddr> {
        match destination {
            Peer::Automation => Some(self.automation),
            Peer::Surface(name) => self.surfaces.get(name).copied(),
        }
    }
}

fn socket_addr(endpoint: &HostPort) -> std::result::Result<SocketAddr, BridgeError> {
    let context = || format!("resolving {endpoint}");
    (endpoint.host.as_str(), endpoint.port)
        .to_socket_addrs()
        .map_err(|source| BridgeError::Io { context: context(), source })?
        .next()
        .ok_or_else(|| BridgeError::Io { context: context(), source: io::Error::from(io::ErrorKind::NotFound) })
}

fn run(mut bridge: Bridge, describe_plugin: Option<PluginTarget>) -> std::result::Result<(), BridgeError> {
    let routes = Routes::resolve(&bridge)?;
    let listen = bridge.listen().clone();
    let socket = UdpSocket::bind((listen.host.as_str(), listen.port))
        .map_err(|source| BridgeError::Io { context: format!("binding {listen}"), source })?;
    tracing::info!(
        listen = %listen,
        automation = %routes.automation,
        surfaces = routes.surfaces.len(),
        "bridge listening"
    );

    send(&socket, &routes, &bridge.handshake())?;
    if let Some(target) = describe_plugin {
        let request = bridge.describe_plugin(target.strip, target.plugin);
        send(&socket, &routes, &request)?;
    }

    let mut buf = vec![0u8; MAX_PACKET];
    loop {
        let (len, from) =
            socket.recv_from(&mut buf).map_err(|source| BridgeError::Io { context: "receiving".to_string(), source })?;

        let Some(origin) = routes.origin(from) else {
            tracing::warn!(from = %from, "datagram from unknown sender");
            continue;
        };
        let messages = match osc::decode(&buf[..len]) {
            Ok(messages) => messages,
            Err(err) => {
                tracing::warn!(from = %from, error = %err, "undecodable datagram");
                continue;
            }
        };

        for message in messages {
            let report = bridge.dispatch(&Inbound { origin: origin.clone(), message });
            for out in &report.outputs {
                if let Err(err) = send(&socket, &routes, out) {
                    tracing::warn!(error = %err, "send failed");
                }
            }
        }
    }
}

fn send(socket: &UdpSocket, routes: &Routes, out: &Outbound) -> std::result::Result<(), BridgeError> {
    let Some(addr) = routes.address(&out.destination) else {
        tracing::debug!(destination = %out.destination, message = %out.message, "no peer address, dropping");
        return Ok(());
    };
    tracing::trace!(destination = %out.destination, message = %out.message, "send");
    socket
        .send_to(&osc::encode(&out.message), addr)
        .map_err(|source| BridgeError::Io { context: format!("sending to {addr}"), source })?;
    Ok(())
}
