//! hidrelay main entry point
//!
//! This binary is a thin command-line front end over the relay control
//! core. It handles CLI parsing, logging setup and rendering of results.

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hidrelay::config::Config;
use hidrelay::platform::resolve_executable;
use hidrelay::relay::{ChannelStates, Target};
use hidrelay::session::{Detection, Session, SessionState};
use hidrelay::{Channel, ChannelState, RelayClient, APP_NAME, VERSION};

/// Control USB-HID relay boards through the vendor hidusb-relay-cmd tool
#[derive(Parser, Debug)]
#[command(name = APP_NAME, version = VERSION, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Relay executable path (skips the search)
    #[arg(long, global = true)]
    executable: Option<PathBuf>,

    /// Target a specific device id
    #[arg(long = "id", global = true)]
    device_id: Option<String>,

    /// Per-command timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show which relay executable will be used
    Locate,

    /// List attached relay devices
    Enum,

    /// Show channel states
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Switch a channel (or "all") on
    On {
        /// Channel number or "all"
        target: Target,
    },

    /// Switch a channel (or "all") off
    Off {
        /// Channel number or "all"
        target: Target,
    },

    /// Flip one channel
    Toggle {
        /// Channel number
        channel: Channel,
    },

    /// Detect a device and count its channels
    Detect {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Connect, poll for changes and accept console commands
    Watch,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Execute command
    if let Err(e) = run(cli).await {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Initialize structured logging with tracing
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load the config file and apply command-line overrides
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config = match &cli.config {
        Some(path) => {
            info!("Loading config: {}", path.display());
            Config::from_file(path)?
        }
        None => Config::new(),
    };

    let config = config
        .with_executable(cli.executable.clone())
        .with_device_id(cli.device_id.clone())
        .with_timeout_secs(cli.timeout);
    config.validate()?;
    Ok(config)
}

/// Resolve the executable and build a client
fn build_client(config: &Config) -> RelayClient {
    let located = resolve_executable(
        config.relay.executable.as_deref(),
        config.relay.resource_dir.clone(),
    );

    RelayClient::new(located.path)
        .with_device_id(config.relay.device_id.clone())
        .with_timeout(config.relay.timeout)
}

/// Run the CLI command
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Version = cli.command {
        println!("{} v{}", APP_NAME, VERSION);
        return Ok(());
    }

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Locate => {
            let located = resolve_executable(
                config.relay.executable.as_deref(),
                config.relay.resource_dir.clone(),
            );
            println!("{} ({})", located.path.display(), located.source);
            Ok(())
        }
        Commands::Enum => {
            let client = build_client(&config);
            let devices = client
                .enumerate()
                .await
                .ok_or_else(|| anyhow!("No relay devices found"))?;
            println!("{}", devices);
            Ok(())
        }
        Commands::Status { json } => {
            let client = build_client(&config);
            let states = client
                .query_channel_states()
                .await
                .ok_or_else(|| anyhow!("Could not read relay status"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&states)?);
            } else {
                print_states(&states);
            }
            Ok(())
        }
        Commands::On { target } => switch(&build_client(&config), target, ChannelState::On).await,
        Commands::Off { target } => switch(&build_client(&config), target, ChannelState::Off).await,
        Commands::Toggle { channel } => {
            let client = build_client(&config);
            let states = client
                .query_channel_states()
                .await
                .ok_or_else(|| anyhow!("Could not read relay status"))?;
            let current = states
                .get(channel)
                .map(ChannelState::from)
                .ok_or_else(|| anyhow!("Relay {} does not exist ({} channels)", channel, states.len()))?;
            switch(&client, Target::Channel(channel), current.toggled()).await
        }
        Commands::Detect { json } => {
            let mut session = Session::new(build_client(&config), config.session.clone());
            let detection = session.detect().await?;
            if json {
                let report = detection_report(&detection, session.state());
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", detection.enumeration);
                println!(
                    "Found {} relay channels{}",
                    detection.channel_count,
                    if detection.used_fallback { " (configured fallback)" } else { "" }
                );
            }
            Ok(())
        }
        Commands::Watch => watch(Session::new(build_client(&config), config.session.clone())).await,
        Commands::Version => Ok(()),
    }
}

/// JSON body for `detect --json`
fn detection_report(detection: &Detection, state: &SessionState) -> serde_json::Value {
    serde_json::json!({
        "detection": detection,
        "state": state,
    })
}

/// Switch one channel or all channels
async fn switch(client: &RelayClient, target: Target, state: ChannelState) -> anyhow::Result<()> {
    let ok = match target {
        Target::Channel(channel) => client.set_channel(channel, state).await,
        Target::All => client.set_all(state).await,
    };

    if !ok {
        bail!("Failed to turn {} relay {}", state, target);
    }
    println!("Relay {} is now {}", target, state);
    Ok(())
}

fn print_states(states: &ChannelStates) {
    for (channel, on) in states.iter() {
        println!("Relay {}: {}", channel, ChannelState::from(on));
    }
}

/// Command typed at the watch console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleCommand {
    Toggle(Channel),
    Set(Target, ChannelState),
    Status,
    Help,
    Quit,
}

impl ConsoleCommand {
    fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let command = match words.as_slice() {
            [] => return Ok(None),
            ["toggle" | "t", channel] => Self::Toggle(channel.parse()?),
            ["on", target] => Self::Set(target.parse()?, ChannelState::On),
            ["off", target] => Self::Set(target.parse()?, ChannelState::Off),
            ["status" | "s"] => Self::Status,
            ["help" | "?"] => Self::Help,
            ["quit" | "q" | "exit"] => Self::Quit,
            _ => bail!("Unknown command: {} (try 'help')", line.trim()),
        };
        Ok(Some(command))
    }
}

const CONSOLE_HELP: &str = "Commands: toggle <N> | on <N|all> | off <N|all> | status | quit";

enum WatchEvent {
    Update(Option<Vec<(Channel, bool)>>),
    Line(std::io::Result<Option<String>>),
    Shutdown,
}

/// Detect, connect and mirror the device until asked to stop
async fn watch(mut session: Session) -> anyhow::Result<()> {
    let detection = session.detect().await?;
    println!("Found {} relay channels", detection.channel_count);

    session.connect().await?;
    print_states(&session.state().channels);
    println!("{}", CONSOLE_HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let event = tokio::select! {
            update = session.next_update() => WatchEvent::Update(update),
            line = lines.next_line(), if stdin_open => WatchEvent::Line(line),
            _ = &mut shutdown => WatchEvent::Shutdown,
        };

        match event {
            WatchEvent::Update(Some(changed)) => {
                for (channel, on) in changed {
                    println!("Relay {}: {}", channel, ChannelState::from(on));
                }
            }
            WatchEvent::Update(None) => {
                warn!("Status polling stopped unexpectedly");
                break;
            }
            WatchEvent::Line(Ok(Some(line))) => match ConsoleCommand::parse(&line) {
                Ok(Some(ConsoleCommand::Quit)) => break,
                Ok(Some(command)) => {
                    if let Err(e) = run_console_command(&mut session, command).await {
                        error!("{}", e);
                    }
                }
                Ok(None) => {}
                Err(e) => println!("{}", e),
            },
            WatchEvent::Line(Ok(None)) => {
                info!("Console input closed");
                break;
            }
            WatchEvent::Line(Err(e)) => {
                warn!("Failed to read console input: {}", e);
                stdin_open = false;
            }
            WatchEvent::Shutdown => break,
        }
    }

    session.disconnect().await;
    Ok(())
}

async fn run_console_command(session: &mut Session, command: ConsoleCommand) -> anyhow::Result<()> {
    match command {
        ConsoleCommand::Toggle(channel) => {
            let state = session
                .toggle(channel)
                .await
                .with_context(|| format!("Failed to toggle relay {}", channel))?;
            println!("Relay {}: {}", channel, state);
        }
        ConsoleCommand::Set(Target::Channel(channel), state) => {
            session.set_channel(channel, state).await?;
            println!("Relay {}: {}", channel, state);
        }
        ConsoleCommand::Set(Target::All, state) => {
            session.set_all(state).await?;
            print_states(&session.state().channels);
        }
        ConsoleCommand::Status => {
            session.refresh().await?;
            print_states(&session.state().channels);
        }
        ConsoleCommand::Help => println!("{}", CONSOLE_HELP),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_parse() {
        assert_eq!(ConsoleCommand::parse("").unwrap(), None);
        assert_eq!(
            ConsoleCommand::parse("toggle 2").unwrap(),
            Some(ConsoleCommand::Toggle(Channel::new(2).unwrap()))
        );
        assert_eq!(
            ConsoleCommand::parse("  on all ").unwrap(),
            Some(ConsoleCommand::Set(Target::All, ChannelState::On))
        );
        assert_eq!(
            ConsoleCommand::parse("off 3").unwrap(),
            Some(ConsoleCommand::Set(
                Target::Channel(Channel::new(3).unwrap()),
                ChannelState::Off
            ))
        );
        assert_eq!(ConsoleCommand::parse("q").unwrap(), Some(ConsoleCommand::Quit));
        assert!(ConsoleCommand::parse("toggle 0").is_err());
        assert!(ConsoleCommand::parse("dance").is_err());
    }

    #[test]
    fn test_cli_parses_targets() {
        let cli = Cli::try_parse_from(["hidrelay", "--id", "HURTM", "on", "all"]).unwrap();
        assert_eq!(cli.device_id.as_deref(), Some("HURTM"));
        assert!(matches!(cli.command, Commands::On { target: Target::All }));

        let cli = Cli::try_parse_from(["hidrelay", "toggle", "2"]).unwrap();
        assert!(matches!(cli.command, Commands::Toggle { channel } if channel.index() == 2));

        assert!(Cli::try_parse_from(["hidrelay", "toggle", "0"]).is_err());
    }

    #[test]
    fn test_detection_report_keeps_fallback_flag() {
        let session = Session::new(
            RelayClient::new("hidusb-relay-cmd"),
            hidrelay::config::SessionConfig::default(),
        );
        let detection = Detection {
            enumeration: "Board ID=[HURTM]".to_string(),
            channel_count: 4,
            used_fallback: true,
        };

        let report = detection_report(&detection, session.state());
        assert_eq!(report["detection"]["used_fallback"], true);
        assert_eq!(report["detection"]["channel_count"], 4);
        assert_eq!(report["state"]["phase"], "idle");
    }

    #[test]
    fn test_cli_verify() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
