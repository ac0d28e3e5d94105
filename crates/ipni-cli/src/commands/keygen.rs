//! Provider key generation.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use colored::Colorize;
use ipni_ad::{Identity, KeyAlgorithm};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize)]
struct KeypairFile {
    algorithm: String,
    peer_id: String,
    /// Base64 libp2p protobuf encoding, as fixture configs expect.
    private_key: String,
}

/// Handle the `ipni keygen` command.
pub fn cmd_keygen(algorithm: KeyAlgorithm, out: Option<&Path>) -> Result<()> {
    let identity = Identity::generate(algorithm)?;
    let private_key = STANDARD.encode(identity.to_protobuf_encoding()?);
    let peer_id = identity.peer_id().to_string();

    if let Some(path) = out {
        let keypair = KeypairFile {
            algorithm: algorithm.to_string(),
            peer_id,
            private_key,
        };
        let json = serde_json::to_string_pretty(&keypair)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write keypair to {}", path.display()))?;
        println!("{} Keypair written to {}", "✓".green(), path.display());
    } else {
        println!(
            "{}",
            format!("Generated {algorithm} Keypair").bold().underline()
        );
        println!("{}: {}", "Peer ID".bold().green(), peer_id);
        println!("{}: {}", "Private Key".bold().red(), private_key);
        println!();
        println!(
            "{}",
            "WARNING: Keep the private key secret!".yellow().bold()
        );
    }

    Ok(())
}
