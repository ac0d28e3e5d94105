//! Human and JSON views of an advertisement.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use colored::Colorize;
use ipni_ad::metadata::TransportMetadata;
use ipni_ad::{addrs, no_entries, open_signature, Advertisement, Cid, Codec};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct AdSummary {
    pub link: String,
    pub previous: Option<String>,
    pub provider: String,
    pub addresses: Vec<String>,
    pub entries: String,
    pub context_id: String,
    pub metadata: String,
    pub is_remove: bool,
    pub signature: String,
    pub extended_providers: Option<ExtendedSummary>,
}

#[derive(Debug, Serialize)]
pub struct ExtendedSummary {
    #[serde(rename = "override")]
    pub is_override: bool,
    pub providers: Vec<ProviderSummary>,
}

#[derive(Debug, Serialize)]
pub struct ProviderSummary {
    pub id: String,
    pub addresses: Vec<String>,
    pub metadata: String,
    #[serde(rename = "override")]
    pub is_override: bool,
}

impl AdSummary {
    /// Summarize `ad`, whose encoded bytes have link `link`.
    pub fn new(ad: &Advertisement, link: &Cid) -> Self {
        Self {
            link: link.to_string(),
            previous: ad.previous().map(ToString::to_string),
            provider: ad.provider().to_string(),
            addresses: addrs::to_strings(ad.addresses()),
            entries: ad.entries().to_string(),
            context_id: STANDARD.encode(ad.context_id()),
            metadata: STANDARD.encode(ad.metadata()),
            is_remove: ad.is_remove(),
            signature: STANDARD.encode(ad.signature()),
            extended_providers: ad.extended_providers().map(|set| ExtendedSummary {
                is_override: set.is_override(),
                providers: set
                    .providers()
                    .iter()
                    .map(|entry| ProviderSummary {
                        id: entry.provider().to_string(),
                        addresses: addrs::to_strings(entry.addresses()),
                        metadata: STANDARD.encode(entry.metadata()),
                        is_override: entry.is_override(),
                    })
                    .collect(),
            }),
        }
    }
}

/// Handle the `ipni show` command.
pub fn cmd_show(file: &Path, json: bool, codec: Codec) -> Result<()> {
    let bytes =
        fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let ad = Advertisement::decode_as(&bytes, codec).with_context(|| {
        format!("failed to decode {codec} advertisement from {}", file.display())
    })?;
    let link = codec.link(&bytes);

    if json {
        let summary = AdSummary::new(&ad, &link);
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", "Advertisement".bold().underline());
    println!("{}: {}", "Link".bold(), link);
    match ad.previous() {
        Some(previous) => println!("{}: {}", "Previous".bold(), previous),
        None => println!("{}: {}", "Previous".bold(), "none (chain start)".yellow()),
    }
    println!("{}: {}", "Provider".bold(), ad.provider().to_string().cyan());
    for addr in ad.addresses() {
        println!("  - {addr}");
    }
    if *ad.entries() == no_entries() {
        println!("{}: {}", "Entries".bold(), "none".yellow());
    } else {
        println!("{}: {}", "Entries".bold(), ad.entries());
    }
    println!("{}: {}", "Context ID".bold(), STANDARD.encode(ad.context_id()));
    println!("{}: {}", "Metadata".bold(), describe_metadata(ad.metadata()));
    if ad.is_wildcard_removal() {
        println!("{}: {}", "Removal".bold(), "all contexts".red().bold());
    } else if ad.is_remove() {
        println!("{}: {}", "Removal".bold(), "yes".red());
    }
    match open_signature(ad.signature()) {
        Ok(opened) => println!(
            "{}: {} (digest {})",
            "Signer".bold(),
            opened.signer_peer_id(),
            opened.digest_hex()
        ),
        Err(_) => println!("{}: {}", "Signer".bold(), "unreadable envelope".red()),
    }

    if let Some(set) = ad.extended_providers() {
        println!(
            "{} ({}: {})",
            "Extended Providers".bold(),
            "override".bold(),
            set.is_override()
        );
        for entry in set.providers() {
            println!("  - {}", entry.provider().to_string().green());
            for addr in entry.addresses() {
                println!("      {addr}");
            }
            if !entry.metadata().is_empty() {
                println!("      metadata: {}", describe_metadata(entry.metadata()));
            }
        }
    }

    Ok(())
}

fn describe_metadata(metadata: &[u8]) -> String {
    if metadata.is_empty() {
        return "none".to_string();
    }
    match TransportMetadata::decode(metadata) {
        Ok(TransportMetadata::Bitswap) => "bitswap".to_string(),
        Ok(TransportMetadata::Http) => "http".to_string(),
        Ok(TransportMetadata::GraphsyncFilecoinV1 {
            piece_cid,
            verified_deal,
            fast_retrieval,
        }) => format!(
            "graphsync-filecoinv1 (piece {piece_cid}, verified {verified_deal}, fast retrieval {fast_retrieval})"
        ),
        Err(_) => format!("0x{}", hex::encode(metadata)),
    }
}
