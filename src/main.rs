// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use qrcam::config::Config;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "qrcam")]
#[command(about = "Generate QR codes and scan them with a camera")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode text as a QR code image (saved as qrcode.png)
    Generate {
        /// Text to encode
        text: String,

        /// Directory to save into (default: downloads directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Image edge length in pixels
        #[arg(short, long)]
        size: Option<u32>,

        /// Quiet zone in modules
        #[arg(short, long)]
        margin: Option<u32>,
    },

    /// Scan a QR code from a camera
    Scan {
        /// Camera device path (from 'qrcam list')
        #[arg(short, long, conflicts_with = "image")]
        device: Option<String>,

        /// Scan a still image instead of a camera
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Keep scanning and print every new code
        #[arg(short, long)]
        continuous: bool,

        /// Copy the decoded text to the clipboard
        #[arg(long)]
        copy: bool,

        /// Print results as JSON lines
        #[arg(long)]
        json: bool,

        /// Give up after this many seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// List available cameras
    List,

    /// Show the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=qrcam=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command {
        Commands::Generate {
            text,
            output_dir,
            size,
            margin,
        } => runtime.block_on(cli::generate(&config, text, output_dir, size, margin))?,
        Commands::Scan {
            device,
            image,
            continuous,
            copy,
            json,
            timeout,
        } => runtime.block_on(cli::scan(
            &config,
            cli::ScanArgs {
                device,
                image,
                continuous,
                copy,
                json,
                timeout,
            },
        ))?,
        Commands::List => cli::list_cameras()?,
        Commands::Config { init } => cli::show_config(&config, init)?,
    }

    Ok(())
}
