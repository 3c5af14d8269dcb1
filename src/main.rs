use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mbus_fields::drivers::manufacturer::{id_to_manufacturer, manufacturer_name};
use mbus_fields::util::hex::{decode_hex, pretty_hex};
use mbus_fields::logging::{log_error, log_warn};
use mbus_fields::{init_logger, log_info, Decoder, DecoderConfig, VersionMatch};

#[derive(Parser)]
#[command(name = "mbus-decode")]
#[command(about = "Decode wireless M-Bus telegrams into named meter values")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode one telegram given as hex (link layer CRCs removed)
    Decode {
        telegram: String,
        /// Use this driver instead of detecting one from the header
        #[arg(short, long)]
        driver: Option<String>,
        /// JSON decoder configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        pretty: bool,
        /// Print a hex dump of the telegram first
        #[arg(long)]
        dump: bool,
    },
    /// List the registered drivers
    Drivers {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_decoder(config: Option<&PathBuf>) -> Result<Decoder> {
    let config = match config {
        Some(path) => DecoderConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DecoderConfig::default(),
    };
    Ok(Decoder::from_config(&config)?)
}

fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decode {
            telegram,
            driver,
            config,
            pretty,
            dump,
        } => {
            let decoder = load_decoder(config.as_ref())?;
            let bytes = decode_hex(&telegram).context("telegram is not valid hex")?;
            if dump {
                println!("{}", pretty_hex(&bytes, 16));
            }

            let decoded = match driver {
                Some(name) => decoder.decode_with_driver(&bytes, &name),
                None => decoder.decode(&bytes),
            }
            .map_err(|error| {
                log_error(&format!("telegram rejected: {error}"));
                error
            })?;
            if let Some(error) = decoded.chain_error() {
                log_warn(&format!("partial decode: {error}"));
            }
            for diagnostic in &decoded.diagnostics {
                log_info(&format!("diagnostic: {diagnostic}"));
            }

            let json = decoded.to_json();
            if pretty {
                println!("{}", serde_json::to_string_pretty(&json)?);
            } else {
                println!("{json}");
            }
        }
        Commands::Drivers { config } => {
            let decoder = load_decoder(config.as_ref())?;
            for driver in decoder.registry().drivers() {
                println!("{} ({}, {:?})", driver.name, driver.meter_type, driver.link_modes);
                for key in &driver.detection {
                    let maker = manufacturer_name(key.manufacturer).unwrap_or("unknown manufacturer");
                    let version = match key.version {
                        VersionMatch::Exact(v) => format!("0x{v:02X}"),
                        VersionMatch::Any => "any".to_string(),
                    };
                    println!(
                        "  {} ({}) media 0x{:02X} version {}",
                        id_to_manufacturer(key.manufacturer),
                        maker,
                        key.media,
                        version
                    );
                }
                for field in &driver.fields {
                    println!("  - {}: {}", field.name, field.description);
                }
            }
        }
    }

    Ok(())
}
