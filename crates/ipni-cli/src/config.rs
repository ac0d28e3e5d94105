//! Fixture configuration.
//!
//! A fixture file describes one advertisement in TOML. The first provider is
//! the publisher; every provider, the publisher included, is also listed as an
//! extended provider.
//!
//! ```toml
//! context_id = "Y3R4MQ=="
//! entries = "bafybeiczsscdsbs7ffqz55asqdf3smv6klcw3gofszvwlyarci47bgf354"
//! override = false
//!
//! [[providers]]
//! peer_id = "12D3KooW..."
//! private_key = "CAESQ..."
//! addresses = ["/ip4/12.34.56.78/tcp/999/ws"]
//! metadata = "gBI"
//! ```

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine as _;
use ipni_ad::{addrs, Cid, Identity, Multiaddr, PeerId};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureConfig {
    /// Base64 context ID.
    pub context_id: String,
    /// Entries link; the no-entries sentinel when absent.
    #[serde(default)]
    pub entries: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(rename = "override", default)]
    pub is_override: bool,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub peer_id: String,
    /// Base64 libp2p protobuf-encoded private key.
    pub private_key: String,
    pub addresses: Vec<String>,
    /// Base64 metadata, padded or not.
    #[serde(default)]
    pub metadata: String,
}

impl FixtureConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture config {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("invalid fixture config {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("failed to parse TOML")?;
        if config.providers.is_empty() {
            bail!("fixture config lists no providers");
        }
        Ok(config)
    }

    pub fn context_id(&self) -> Result<Vec<u8>> {
        decode_base64(&self.context_id).context("invalid context_id")
    }

    pub fn entries(&self) -> Result<Option<Cid>> {
        parse_cid(self.entries.as_deref()).context("invalid entries link")
    }

    pub fn previous(&self) -> Result<Option<Cid>> {
        parse_cid(self.previous.as_deref()).context("invalid previous link")
    }
}

impl ProviderConfig {
    /// Decode the private key and check it belongs to the stated peer ID.
    pub fn identity(&self) -> Result<Identity> {
        let stated: PeerId = self
            .peer_id
            .parse()
            .map_err(|e| anyhow!("invalid peer ID {}: {e}", self.peer_id))?;
        let key = decode_base64(&self.private_key)
            .with_context(|| format!("invalid private key for {}", self.peer_id))?;
        let identity = Identity::from_protobuf_encoding(&key)
            .with_context(|| format!("invalid private key for {}", self.peer_id))?;
        if identity.peer_id() != stated {
            bail!(
                "private key for {} belongs to {}",
                self.peer_id,
                identity.peer_id()
            );
        }
        Ok(identity)
    }

    pub fn addresses(&self) -> Result<Vec<Multiaddr>> {
        Ok(addrs::parse_all(&self.addresses)?)
    }

    pub fn metadata(&self) -> Result<Vec<u8>> {
        decode_base64(&self.metadata)
            .with_context(|| format!("invalid metadata for {}", self.peer_id))
    }
}

/// Decode base64 with or without padding.
pub fn decode_base64(value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .or_else(|_| STANDARD_NO_PAD.decode(value))
        .map_err(|e| anyhow!("invalid base64 {value:?}: {e}"))
}

fn parse_cid(value: Option<&str>) -> Result<Option<Cid>> {
    value
        .map(|s| s.parse::<Cid>().map_err(|e| anyhow!("{s:?}: {e}")))
        .transpose()
}
