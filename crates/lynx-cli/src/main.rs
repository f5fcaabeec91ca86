//! Lynx CLI - command-line access to the IoT Open Lynx platform

use anyhow::Context;
use clap::{Parser, Subcommand};
use lynx_client::{
    Auth, ConfigLoader, Filter, FunctionListExt, LynxClient, LynxConfig, Message, Qos,
};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "lynx")]
#[command(version)]
#[command(about = "Command-line client for the Lynx IoT platform", long_about = None)]
struct Cli {
    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "LYNX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the API answers
    Ping,

    /// List installations
    Installations {
        /// Only installations assigned to the user
        #[arg(long)]
        assigned: bool,
    },

    /// List functions of an installation
    Functions {
        /// Installation ID
        #[arg(short, long)]
        installation: i64,

        /// Metadata filter as key=value, repeatable
        #[arg(short, long, value_parser = parse_key_value)]
        filter: Vec<(String, String)>,
    },

    /// Format a value the way a function displays it
    Format {
        /// Installation ID
        #[arg(short, long)]
        installation: i64,

        /// Function ID
        #[arg(short, long)]
        function: i64,

        /// Raw reading
        #[arg(long, allow_hyphen_values = true)]
        value: f64,

        /// Topic key (defaults to read)
        #[arg(short, long, default_value = "")]
        topic: String,
    },

    /// Show the latest value of each topic
    Status {
        /// Installation ID
        #[arg(short, long)]
        installation: i64,

        /// Only these topics, repeatable
        #[arg(short, long = "topic")]
        topics: Vec<String>,
    },

    /// Publish a value over MQTT
    Publish {
        /// Topic to publish on
        #[arg(short, long)]
        topic: String,

        /// Value to publish
        #[arg(long, allow_hyphen_values = true)]
        value: f64,

        /// Optional message text
        #[arg(short, long)]
        msg: Option<String>,

        /// QoS level (0, 1 or 2)
        #[arg(short, long, default_value = "0")]
        qos: u8,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration file
    let config = load_config(cli.config.clone())?;

    // Setup logging - CLI verbose flag takes precedence, then config, then default
    let log_level = if cli.verbose > 0 {
        match cli.verbose {
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    } else {
        match config.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if config.auth == Auth::None {
        warn!("No credentials configured, requests are anonymous");
    }

    match cli.command {
        Commands::Ping => ping_command(config).await,
        Commands::Installations { assigned } => installations_command(config, assigned).await,
        Commands::Functions {
            installation,
            filter,
        } => functions_command(config, installation, filter.into_iter().collect()).await,
        Commands::Format {
            installation,
            function,
            value,
            topic,
        } => format_command(config, installation, function, value, &topic).await,
        Commands::Status {
            installation,
            topics,
        } => status_command(config, installation, &topics).await,
        Commands::Publish {
            topic,
            value,
            msg,
            qos,
        } => publish_command(config, &topic, value, msg, qos).await,
    }
}

/// Load configuration from file/env
///
/// A missing file means defaults, a broken one is an error.
fn load_config(cli_path: Option<PathBuf>) -> anyhow::Result<LynxConfig> {
    let loader = ConfigLoader::new().with_cli_path(cli_path);
    loader.load().context("failed to load configuration")
}

async fn ping_command(config: LynxConfig) -> anyhow::Result<()> {
    let api_base = config.api_base.clone();
    let client = LynxClient::new(config)?;
    client.ping().await?;
    println!("{api_base}: ok");
    Ok(())
}

async fn installations_command(config: LynxConfig, assigned: bool) -> anyhow::Result<()> {
    let client = LynxClient::new(config)?;
    let installations = client.get_installations(assigned).await?;
    info!("Found {} installations", installations.len());
    for installation in installations {
        println!(
            "{:>8}  {:>8}  {}",
            installation.id, installation.client_id, installation.name
        );
    }
    Ok(())
}

async fn functions_command(
    config: LynxConfig,
    installation_id: i64,
    filter: Filter,
) -> anyhow::Result<()> {
    let client = LynxClient::new(config)?;
    let functions = client.get_functions(installation_id, &filter).await?;
    let by_id = functions.map_by_id();
    let mut ids: Vec<_> = by_id.keys().copied().collect();
    ids.sort_unstable();

    for id in ids {
        let function = by_id[&id];
        println!(
            "{:>8}  {:<20}  {}",
            function.id,
            function.function_type,
            function.meta.get("name").unwrap_or("-")
        );
    }
    Ok(())
}

async fn format_command(
    config: LynxConfig,
    installation_id: i64,
    function_id: i64,
    value: f64,
    topic: &str,
) -> anyhow::Result<()> {
    let client = LynxClient::new(config)?;
    let function = client
        .get_function(installation_id, function_id)
        .await
        .with_context(|| format!("failed to get function {function_id}"))?;
    println!("{}", function.format_value(value, topic));
    Ok(())
}

async fn status_command(
    config: LynxConfig,
    installation_id: i64,
    topics: &[String],
) -> anyhow::Result<()> {
    let client = LynxClient::new(config)?;
    let status = client.status(installation_id, topics).await?;

    let mut entries: Vec<_> = status.iter().collect();
    entries.sort_by(|a, b| a.topic.cmp(&b.topic));
    for entry in entries {
        let time = Message::new(entry.value)
            .with_timestamp(entry.timestamp)
            .time()
            .to_rfc3339();
        if entry.message.is_empty() {
            println!("{}  {}  {}", time, entry.topic, entry.value);
        } else {
            println!("{}  {}  {}  {}", time, entry.topic, entry.value, entry.message);
        }
    }
    Ok(())
}

async fn publish_command(
    config: LynxConfig,
    topic: &str,
    value: f64,
    msg: Option<String>,
    qos: u8,
) -> anyhow::Result<()> {
    if config.mqtt.is_none() {
        anyhow::bail!("no [mqtt] section in the configuration");
    }
    let qos = Qos::try_from(qos)?;

    let client = LynxClient::connect(config).await?;
    let mqtt = client.mqtt()?;

    let mut message = Message::now(value);
    if let Some(msg) = msg {
        message = message.with_msg(msg);
    }
    mqtt.publish(topic, &message, qos).await?;
    info!("Published {} to {}", value, topic);

    mqtt.disconnect().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("name=*blinder").unwrap(),
            ("name".to_string(), "*blinder".to_string())
        );
        assert_eq!(
            parse_key_value("expr=a=b").unwrap(),
            ("expr".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
    }

    #[test]
    fn test_cli_parses_commands() {
        let cli = Cli::try_parse_from([
            "lynx",
            "-vv",
            "functions",
            "--installation",
            "19",
            "--filter",
            "name=*blinder",
            "--filter",
            "type=switch",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Functions {
                installation,
                filter,
            } => {
                assert_eq!(installation, 19);
                assert_eq!(filter.len(), 2);
            }
            _ => panic!("expected functions command"),
        }

        let cli = Cli::try_parse_from([
            "lynx", "format", "-i", "1", "-f", "2", "--value", "-3.5",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Format { value, .. } if value == -3.5
        ));
    }

    #[test]
    fn test_cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
