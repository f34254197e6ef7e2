//! # ROV Bridge
//!
//! Teleoperate an ArduSub ROV over MAVLink from an operator command stream.
//!
//! The binary wires the bridge to a line-based operator source on stdin:
//!
//! ```text
//! start ccu-01          begin a teleoperation session
//! Forward=0.5;GainUp=1  one cycle of axis values and button flags
//! stop                  end the session
//! ```
//!
//! Everything else (parameter sync, control claim, heartbeats, reconnect)
//! runs inside the bridge loop until Ctrl+C.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rov_bridge::bridge::Bridge;
use rov_bridge::config::Config;
use rov_bridge::teleop::actions::{ActionSet, TeleopEvent};

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path);

    let loaded = config.is_ok();
    let config = config.unwrap_or_default();
    let _log_guard = init_tracing(&config.log.dir);

    info!("ROV Bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    if !loaded {
        warn!("Could not load {}, using built-in defaults", config_path);
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    tokio::spawn(read_operator_events(event_tx));

    let bridge = Bridge::new(&config, event_rx)?;
    let (stop_tx, stop_rx) = watch::channel(false);
    let bridge_task = tokio::spawn(bridge.run(stop_rx));

    info!("Press Ctrl+C to exit");
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");

    let _ = stop_tx.send(true);
    bridge_task.await?;
    Ok(())
}

/// Initializes the tracing subscriber, optionally with a rolling log file.
///
/// Returns the appender guard that must stay alive for the file writer to
/// flush.
fn init_tracing(log_dir: &str) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    if log_dir.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        None
    } else {
        let appender = tracing_appender::rolling::daily(log_dir, "rov-bridge.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    }
}

/// Reads operator lines from stdin until it closes.
async fn read_operator_events(tx: mpsc::UnboundedSender<TeleopEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Some(event) = parse_operator_line(&line) else {
            continue;
        };
        if tx.send(event).is_err() {
            break;
        }
    }
    info!("Operator input closed");
}

/// Parses one operator line into an event.
///
/// `start [originator]` and `stop` control the session; any other
/// non-empty line is an action tuple list.
fn parse_operator_line(line: &str) -> Option<TeleopEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let mut parts = line.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or("");
    let rest = parts.next();
    match head {
        "start" => Some(TeleopEvent::Start {
            originator: rest.unwrap_or("").trim().to_string(),
        }),
        "stop" if rest.is_none() => Some(TeleopEvent::Stop),
        _ => Some(TeleopEvent::Actions(ActionSet::parse(line))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_with_originator() {
        let event = parse_operator_line("start ccu-01").unwrap();
        assert_eq!(event, TeleopEvent::Start { originator: "ccu-01".to_string() });
    }

    #[test]
    fn test_parse_start_without_originator() {
        let event = parse_operator_line("start").unwrap();
        assert_eq!(event, TeleopEvent::Start { originator: String::new() });
    }

    #[test]
    fn test_parse_stop() {
        assert_eq!(parse_operator_line("stop").unwrap(), TeleopEvent::Stop);
    }

    #[test]
    fn test_parse_action_tuples() {
        let event = parse_operator_line("Forward=0.5;GainUp=1").unwrap();
        let TeleopEvent::Actions(actions) = event else {
            panic!("expected an actions event");
        };
        assert_eq!(actions.axis("Forward"), Some(0.5));
        assert!(actions.button("GainUp"));
    }

    #[test]
    fn test_parse_blank_line_is_skipped() {
        assert!(parse_operator_line("").is_none());
        assert!(parse_operator_line("   ").is_none());
    }

    #[test]
    fn test_stop_with_trailing_tokens_is_an_action_line() {
        // "stop now" is not the stop command; it parses (to an empty
        // action set) rather than ending the session by accident
        let event = parse_operator_line("stop now").unwrap();
        assert!(matches!(event, TeleopEvent::Actions(_)));
    }
}
