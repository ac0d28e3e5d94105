use anyhow::Result;
use clap::{Parser, Subcommand};
use ipni_ad::{Codec, KeyAlgorithm};
use ipni_cli::commands::{fixture, keygen, show, verify};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Build, sign, and verify IPNI advertisements.
#[derive(Parser, Debug)]
#[command(name = "ipni", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build and sign an advertisement from a TOML fixture description.
    Fixture {
        /// Path to the fixture config.
        config: PathBuf,
        /// Write the encoded advertisement here instead of printing a summary.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Encoding of the written advertisement (dag-cbor or dag-json).
        #[arg(long, default_value = "dag-cbor")]
        codec: Codec,
    },
    /// Decode, validate, and verify an encoded advertisement.
    Verify {
        file: PathBuf,
        #[arg(long, default_value = "dag-cbor")]
        codec: Codec,
    },
    /// Generate a provider keypair.
    Keygen {
        #[arg(long, default_value = "ed25519")]
        algorithm: KeyAlgorithm,
        /// Write the keypair as JSON instead of printing it.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print an encoded advertisement without verifying it.
    Show {
        file: PathBuf,
        /// Print as JSON.
        #[arg(long)]
        json: bool,
        #[arg(long, default_value = "dag-cbor")]
        codec: Codec,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Fixture { config, out, codec } => {
            fixture::cmd_fixture(&config, out.as_deref(), codec)
        }
        Commands::Verify { file, codec } => verify::cmd_verify(&file, codec),
        Commands::Keygen { algorithm, out } => keygen::cmd_keygen(algorithm, out.as_deref()),
        Commands::Show { file, json, codec } => show::cmd_show(&file, json, codec),
    }
}
