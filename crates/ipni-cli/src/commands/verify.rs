//! Advertisement verification.

use anyhow::{Context, Result};
use ipni_ad::{verify_encoded, Codec, ValidationLimits};
use std::fs;
use std::path::Path;
use tracing::info;

/// Handle the `ipni verify` command.
pub fn cmd_verify(file: &Path, codec: Codec) -> Result<()> {
    let bytes =
        fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let verified = verify_encoded(&bytes, codec, &ValidationLimits::default())
        .with_context(|| format!("advertisement in {} failed verification", file.display()))?;

    info!(link = %verified.link, %codec, "verified advertisement");
    println!("Valid! Signed by {}", verified.signer);
    Ok(())
}
