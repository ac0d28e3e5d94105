//! Fixture generation.

use crate::commands::show::AdSummary;
use crate::config::FixtureConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use ipni_ad::{AdBuilder, Advertisement, Codec, ExtendedProviderInfo};
use std::fs;
use std::path::Path;
use tracing::info;

/// Build and sign the advertisement a fixture config describes.
///
/// The first provider publishes; every provider is attached as an extended
/// provider signed with its own key.
pub fn build_fixture(config: &FixtureConfig) -> Result<Advertisement> {
    let context_id = config.context_id()?;
    let (publisher, rest) = config
        .providers
        .split_first()
        .context("fixture config lists no providers")?;

    let mut builder = AdBuilder::new(publisher.identity()?, publisher.addresses()?);
    builder
        .with_context_id(context_id)?
        .with_metadata(publisher.metadata()?)?
        .with_previous(config.previous()?)?
        .with_override(config.is_override)?;
    if let Some(entries) = config.entries()? {
        builder.with_entries(entries)?;
    }

    for provider in std::iter::once(publisher).chain(rest) {
        let info = ExtendedProviderInfo::new(
            provider.identity()?,
            provider.addresses()?,
            provider.metadata()?,
        );
        builder.with_extended_provider(info)?;
    }

    let ad = builder
        .build_and_sign()
        .context("failed to build and sign advertisement")?;
    info!(provider = %ad.provider(), extended = config.providers.len(), "built fixture");
    Ok(ad)
}

/// Handle the `ipni fixture` command.
pub fn cmd_fixture(config_path: &Path, out: Option<&Path>, codec: Codec) -> Result<()> {
    let config = FixtureConfig::load(config_path)?;
    let ad = build_fixture(&config)?;
    let bytes = ad.encode_as(codec)?;
    let link = codec.link(&bytes);

    match out {
        Some(path) => {
            fs::write(path, &bytes)
                .with_context(|| format!("failed to write advertisement to {}", path.display()))?;
            println!(
                "{} Advertisement {} written to {} as {}",
                "✓".green(),
                link,
                path.display(),
                codec
            );
        }
        None => {
            let summary = AdSummary::new(&ad, &link);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
