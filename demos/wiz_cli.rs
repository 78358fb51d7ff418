//! CLI application for discovering and switching Wiz lights.
//!
//! Run with: cargo run --example wiz_cli -- --help
//!
//! Set `RUST_LOG=wiz_roomctl=debug` to see every request and reply.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;
use wiz_roomctl::{Client, ClientConfig, Device, PowerState, Poller};

#[derive(Parser)]
#[command(name = "wiz-cli")]
#[command(about = "Discover and control Wiz lights by room", long_about = None)]
struct Cli {
    /// Address of a single device (required for device commands)
    #[arg(short, long, global = true)]
    ip: Option<String>,

    /// Broadcast address used for discovery
    #[arg(short, long, global = true)]
    broadcast: Option<String>,

    /// JSON configuration file (camelCase keys, all optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover devices and list them by room
    Discover {
        /// Discovery timeout in milliseconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Show the power state of a device
    Status,

    /// Turn a device on
    On,

    /// Turn a device off
    Off,

    /// Toggle a device on/off
    Toggle,

    /// Show the system configuration of a device
    Info,

    /// Send an arbitrary method with JSON params to a device
    Send {
        method: String,
        /// JSON object, e.g. '{"state":true}'
        #[arg(default_value = "{}")]
        params: String,
    },

    /// Switch every device of a room on or off
    Room {
        /// Room id as reported by the devices
        room: String,
        /// "on" or "off"
        #[arg(value_parser = ["on", "off"])]
        state: String,
    },

    /// Refresh rooms and states periodically until Ctrl+C
    Watch {
        /// Seconds between refreshes
        #[arg(short = 'n', long, default_value = "5")]
        interval: u64,

        /// Previously known device addresses, reported when offline
        #[arg(short, long)]
        known: Vec<String>,
    },
}

fn load_config(cli: &Cli) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => ClientConfig::default(),
    };
    if let Some(broadcast) = &cli.broadcast {
        config = config.with_broadcast_address(broadcast);
    }
    config.validate()?;
    Ok(config)
}

fn print_response(response: Option<wiz_roomctl::DeviceResponse>) {
    match response {
        Some(response) => println!(
            "{}",
            serde_json::to_string_pretty(response.raw()).unwrap_or_default()
        ),
        None => eprintln!("No response (device unreachable or reply unreadable)"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = Client::new(load_config(&cli)?);

    match cli.command {
        Commands::Discover { timeout } => {
            let config = client.config();
            let timeout = timeout
                .map(Duration::from_millis)
                .unwrap_or(config.discovery_timeout());
            println!(
                "Discovering Wiz devices via {} (timeout: {:?})...",
                config.broadcast_address(),
                timeout
            );

            let devices = client
                .discover_on(config.broadcast_address(), config.port(), timeout)
                .await?;
            if devices.is_empty() {
                println!("No devices found on the network.");
                return Ok(());
            }

            let rooms = client.group_by_room(&devices);
            println!("\nFound {} device(s):", rooms.device_count());
            for room in &rooms {
                println!("  Room {}", room.id());
                for device in room.devices() {
                    println!(
                        "    {:15}  {}",
                        device.address.to_string(),
                        device.module_name
                    );
                }
            }
        }

        Commands::Watch { interval, known } => {
            println!("Refreshing every {interval}s... (Press Ctrl+C to stop)\n");
            let handle = Poller::start(
                client.clone(),
                known,
                Duration::from_secs(interval),
                |refresh| match refresh {
                    Ok(refresh) => {
                        for status in &refresh.statuses {
                            println!(
                                "[room {}] {:15} {:24} {}",
                                status.room_id, status.address, status.module_name, status.power
                            );
                        }
                        for address in &refresh.offline {
                            println!("[offline] {address}");
                        }
                        println!();
                    }
                    Err(e) => eprintln!("Refresh failed: {e}"),
                },
            );

            tokio::signal::ctrl_c().await?;
            handle.stopped().await;
        }

        Commands::Room { room, state } => {
            let on = state == "on";
            let devices = client.discover().await?;
            let rooms = client.group_by_room(&devices);
            let Some(group) = rooms.get(&room) else {
                eprintln!("Room {room} not found. Known rooms: {:?}", rooms.ids());
                return Ok(());
            };

            for outcome in client.set_room_state(group, on).await {
                if outcome.answered() {
                    println!("  {} turned {}", outcome.address, state);
                } else {
                    eprintln!("  {} did not respond", outcome.address);
                }
            }
        }

        command => {
            // All other commands target a single device
            let ip = cli.ip.ok_or("Device address is required for this command. Use --ip <IP>")?;
            let device = Device::new(client, &ip);

            match command {
                Commands::Status => match device.power().await {
                    PowerState::Unknown => println!("{ip}: state unknown"),
                    power => println!("{ip}: {power}"),
                },
                Commands::On => print_response(device.turn_on().await),
                Commands::Off => print_response(device.turn_off().await),
                Commands::Toggle => print_response(device.toggle().await),
                Commands::Info => match device.system_config().await {
                    Some(config) => println!("{}", serde_json::to_string_pretty(&config)?),
                    None => eprintln!("No system configuration received from {ip}"),
                },
                Commands::Send { method, params } => {
                    let params: Value = serde_json::from_str(&params)?;
                    print_response(device.send(&method, &params).await);
                }
                Commands::Discover { .. } | Commands::Watch { .. } | Commands::Room { .. } => {
                    unreachable!()
                }
            }
        }
    }

    Ok(())
}
