//! somweb - command line client for SOMweb garage door devices

mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use somweb::{Credentials, DeviceAddress, DoorStatus, SomwebClient, UpdateStatus};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "somweb")]
#[command(about = "SOMweb garage door client", long_about = None)]
struct Args {
    /// Operation to perform
    #[arg(value_enum)]
    action: Action,

    /// Door id, required for status, open, close and toggle
    #[arg(short, long)]
    door: Option<u32>,

    /// Device url, e.g. http://192.168.1.20
    #[arg(long, conflicts_with = "udi")]
    url: Option<String>,

    /// Device UDI, for access through the cloud service
    #[arg(long)]
    udi: Option<String>,

    #[arg(short, long)]
    username: Option<String>,

    #[arg(short, long)]
    password: Option<String>,

    /// Seconds to wait for a door to reach its new position
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Config file path (default: somweb.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    /// Check that the device answers
    Alive,
    /// Log in and print the result
    Auth,
    /// List doors
    Doors,
    /// Print a door's position
    Status,
    /// Open a door and wait until it is open
    Open,
    /// Close a door and wait until it is closed
    Close,
    /// Flip a door's position
    Toggle,
    /// Check for firmware updates
    Update,
    /// Print device info (administrators only)
    Info,
}

impl Action {
    fn needs_door(self) -> bool {
        matches!(
            self,
            Action::Status | Action::Open | Action::Close | Action::Toggle
        )
    }
}

const AUTH_FAILED: &str = "Authentication failed";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let cfg = config::Config::load(args.config.as_deref())?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let door = match (args.action.needs_door(), args.door) {
        (true, None) => bail!("--door is required for '{:?}'", args.action),
        (_, door) => door,
    };

    let address = match (args.url, args.udi, cfg.device.url.clone(), cfg.device.udi.clone()) {
        (Some(url), _, _, _) => DeviceAddress::Url(url),
        (None, Some(udi), _, _) => DeviceAddress::Udi(udi),
        (None, None, Some(url), _) => DeviceAddress::Url(url),
        (None, None, None, Some(udi)) => DeviceAddress::Udi(udi),
        (None, None, None, None) => bail!("No device given. Use --url or --udi"),
    };
    let username = args
        .username
        .or_else(|| cfg.device.username.clone())
        .context("No username given")?;
    let password = args
        .password
        .or_else(|| cfg.device.password.clone())
        .context("No password given")?;

    let mut options = cfg.client_options();
    if let Some(timeout) = args.timeout {
        options.state_change_timeout = Duration::from_secs(timeout);
    }

    let client = SomwebClient::with_options(address, Credentials::new(username, password), options)
        .context("Failed to create client")?;

    let start = Instant::now();
    let result = execute(&client, args.action, door).await;
    client.close().await;

    println!("{}", result?);
    tracing::info!(
        "Operation took {} ms (this includes time spent on logging in)",
        start.elapsed().as_millis()
    );
    Ok(())
}

/// Run one action and render its result for the terminal
async fn execute(client: &SomwebClient, action: Action, door: Option<u32>) -> Result<String> {
    let probe_only = matches!(action, Action::Alive | Action::Update | Action::Auth);
    if !probe_only && !client.authenticate().await?.success {
        return Ok(AUTH_FAILED.to_string());
    }

    let door_id = || door.context("--door is required");
    let output = match action {
        Action::Alive => client.is_alive().await.to_string(),
        Action::Update => {
            let status = client.update_status().await;
            serde_json::to_string_pretty(&serde_json::json!({
                "update_available": status == UpdateStatus::Available,
                "status": status,
            }))?
        }
        Action::Auth => serde_json::to_string_pretty(&client.authenticate().await?)?,
        Action::Doors => serde_json::to_string_pretty(&client.doors())?,
        Action::Status => client.door_status(door_id()?).await.to_string(),
        Action::Open => open_or_close(client, door_id()?, DoorStatus::Open).await?,
        Action::Close => open_or_close(client, door_id()?, DoorStatus::Closed).await?,
        Action::Toggle => client.toggle(door_id()?, None).await?.to_string(),
        Action::Info => match client.device_info().await {
            Some(info) => serde_json::to_string_pretty(&info)?,
            None => "Device info unavailable".to_string(),
        },
    };
    Ok(output)
}

/// Move a door and wait for it to get there
async fn open_or_close(client: &SomwebClient, door: u32, target: DoorStatus) -> Result<String> {
    let accepted = match target {
        DoorStatus::Open => client.open_door(door, None).await?,
        _ => client.close_door(door, None).await?,
    };
    if !accepted {
        return Ok(false.to_string());
    }
    Ok(client.wait_for_state_default(door, target).await.to_string())
}
