//! Discover all Wiz lights on the network and list them by room.
//!
//! This example demonstrates:
//! - Discovery of Wiz devices on the local network
//! - Grouping the results by reported room id
//! - Querying each device's power state concurrently
//!
//! Run with: cargo run --example discover_rooms -- 192.168.1.255

use std::time::Duration;
use wiz_roomctl::{Client, ClientConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let broadcast = std::env::args()
        .nth(1)
        .unwrap_or_else(|| ClientConfig::BROADCAST_ADDRESS.to_string());
    let client = Client::new(
        ClientConfig::default()
            .with_broadcast_address(&broadcast)
            .with_discovery_timeout(Duration::from_secs(3)),
    );

    println!("Discovering Wiz devices via {broadcast}...");
    let devices = client.discover().await?;

    if devices.is_empty() {
        println!("No devices found on the network.");
        return Ok(());
    }

    let rooms = client.group_by_room(&devices);
    println!("Found {} device(s) in {} room(s):", rooms.device_count(), rooms.len());

    for room in &rooms {
        println!("\nRoom {}", room.id());
        let states = client.get_room_states(room).await;
        for (summary, (_, power)) in room.devices().iter().zip(states) {
            println!(
                "  {:15}  {:24}  {}",
                summary.address.to_string(),
                summary.module_name,
                power
            );
        }
    }

    Ok(())
}
