//! CLI application for controlling Hue lights through a bridge.
//!
//! On first use the bridge must be paired: run `pair`, press the link button
//! on the bridge when asked and hit Enter.
//!
//! Run with: cargo run --example hue_cli -- --help

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hue_lights_rs::{Bridge, Error, LightLike, ResourceKey, discover_bridges};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "hue-cli")]
#[command(about = "Control Hue lights from the command line", long_about = None)]
struct Cli {
    /// Address of the bridge; read from the credential file when omitted
    #[arg(long, global = true)]
    host: Option<String>,

    /// Credential file to use instead of ~/.python_hue
    #[arg(long, global = true)]
    config_file_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find bridges on the local network
    Discover,

    /// Pair with the bridge, waiting for the link button
    Pair,

    /// List lights with their power state
    Lights,

    /// Turn a light on
    On {
        /// Light id or name
        light: String,
    },

    /// Turn a light off
    Off {
        /// Light id or name
        light: String,
    },

    /// Set brightness (0-254)
    Brightness {
        /// Light id or name
        light: String,
        /// Brightness level (0-254)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=254))]
        level: u8,
    },

    /// Activate a scene by group and scene name
    Scene {
        /// Group (room) name
        group: String,
        /// Scene name
        scene: String,
    },
}

fn light_key(light: &str) -> ResourceKey {
    match light.parse::<u32>() {
        Ok(id) => ResourceKey::Id(id),
        Err(_) => ResourceKey::from(light),
    }
}

async fn connect(cli: &Cli) -> Result<Bridge, Error> {
    let mut builder = Bridge::builder();
    if let Some(host) = &cli.host {
        builder = builder.address(host);
    }
    if let Some(path) = &cli.config_file_path {
        builder = builder.config_file_path(path);
    }
    builder.connect().await
}

/// Connect, asking the operator to press the link button until pairing succeeds.
async fn connect_interactive(cli: &Cli) -> Result<Bridge, Box<dyn std::error::Error>> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match connect(cli).await {
            Ok(bridge) => return Ok(bridge),
            Err(Error::Registration { .. }) => {
                println!("Press button on Bridge then hit Enter to try again");
                if stdin.next_line().await?.is_none() {
                    return Err("stdin closed before the bridge was paired".into());
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    if let Commands::Discover = cli.command {
        println!("Discovering bridges...");
        match discover_bridges().await {
            Ok(bridges) if bridges.is_empty() => println!("No bridges found."),
            Ok(bridges) => {
                println!("\nFound {} bridge(s):", bridges.len());
                for bridge in bridges {
                    println!("  IP: {:15}  ID: {}", bridge.internal_ip_address, bridge.id);
                }
            }
            Err(e) => eprintln!("Error during discovery: {}", e),
        }
        return Ok(());
    }

    let mut bridge = connect_interactive(&cli).await?;

    match &cli.command {
        Commands::Discover => {}

        Commands::Pair => {
            println!(
                "Paired with {} as {} (saved to {})",
                bridge.address(),
                bridge.username(),
                bridge.config_file_path().display()
            );
        }

        Commands::Lights => {
            let mut names: Vec<(String, u32)> = bridge
                .light_names()
                .await?
                .iter()
                .map(|(name, id)| (name.clone(), *id))
                .collect();
            names.sort_by_key(|(_, id)| *id);
            for (name, id) in names {
                let on = bridge.light(id).await?.on().await?;
                println!("  {:3}  {:30}  {}", id, name, if on { "ON" } else { "OFF" });
            }
        }

        Commands::On { light } => {
            bridge.light(light_key(light)).await?.set_on(true).await?;
            println!("Light {} turned ON", light);
        }

        Commands::Off { light } => {
            bridge.light(light_key(light)).await?.set_on(false).await?;
            println!("Light {} turned OFF", light);
        }

        Commands::Brightness { light, level } => {
            bridge
                .light(light_key(light))
                .await?
                .set_brightness(*level)
                .await?;
            println!("Light {} brightness set to {}", light, level);
        }

        Commands::Scene { group, scene } => {
            if bridge.run_scene(group, scene).await? {
                println!("Scene '{}' activated in '{}'", scene, group);
            } else {
                eprintln!("No matching scene '{}' for group '{}'", scene, group);
            }
        }
    }

    Ok(())
}
