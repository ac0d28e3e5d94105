//! DAG-CBOR wire shape of advertisements and content-addressed blocks.
//!
//! Node fields are declared in DAG-CBOR canonical key order (shorter keys first,
//! then bytewise) so encoded bytes, and therefore links, are stable.

use crate::addrs;
use crate::advertisement::Advertisement;
use crate::error::AdError;
use crate::extended::{ExtendedProvider, ExtendedProviders};
use cid::multihash::Multihash;
use cid::Cid;
use libp2p_identity::PeerId;
use multiaddr::Multiaddr;
use multihash_codetable::{Code, MultihashDigest};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Multicodec of raw bytes.
pub const RAW: u64 = 0x55;
/// Multicodec of DAG-CBOR.
pub const DAG_CBOR: u64 = 0x71;
/// Multicodec of DAG-JSON.
pub const DAG_JSON: u64 = 0x0129;

pub(crate) const IDENTITY_HASH: u64 = 0x00;

/// Sentinel `Entries` link for records that carry no entries.
///
/// A CIDv1 with the raw codec and an empty identity multihash.
pub fn no_entries() -> Cid {
    Cid::new_v1(RAW, Multihash::default())
}

/// Link of DAG-CBOR encoded bytes.
pub(crate) fn dag_cbor_link(bytes: &[u8]) -> Cid {
    Codec::DagCbor.link(bytes)
}

/// IPLD codec of an encoded advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Codec {
    #[default]
    DagCbor,
    DagJson,
}

impl Codec {
    /// Multicodec code recorded in links.
    pub fn code(self) -> u64 {
        match self {
            Codec::DagCbor => DAG_CBOR,
            Codec::DagJson => DAG_JSON,
        }
    }

    /// Link of bytes encoded with this codec.
    pub fn link(self, bytes: &[u8]) -> Cid {
        Cid::new_v1(self.code(), Code::Sha2_256.digest(bytes))
    }

    pub(crate) fn to_vec<T: Serialize>(self, value: &T) -> Result<Vec<u8>, AdError> {
        match self {
            Codec::DagCbor => serde_ipld_dagcbor::to_vec(value).map_err(|e| e.to_string()),
            Codec::DagJson => serde_ipld_dagjson::to_vec(value).map_err(|e| e.to_string()),
        }
        .map_err(AdError::Encode)
    }

    pub(crate) fn from_slice<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, AdError> {
        match self {
            Codec::DagCbor => serde_ipld_dagcbor::from_slice(bytes).map_err(|e| e.to_string()),
            Codec::DagJson => serde_ipld_dagjson::from_slice(bytes).map_err(|e| e.to_string()),
        }
        .map_err(AdError::Decode)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Codec::DagCbor => "dag-cbor",
            Codec::DagJson => "dag-json",
        };
        f.write_str(name)
    }
}

impl FromStr for Codec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dag-cbor" | "cbor" => Ok(Codec::DagCbor),
            "dag-json" | "json" => Ok(Codec::DagJson),
            other => Err(format!("unknown codec: {other}")),
        }
    }
}

/// Encoded bytes together with their content identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub cid: Cid,
    pub bytes: Vec<u8>,
}

impl Block {
    /// Wrap bytes as they are, linking them without re-encoding.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            cid: dag_cbor_link(&bytes),
            bytes,
        }
    }

    pub fn encode<T: Serialize>(value: &T) -> Result<Self, AdError> {
        Codec::DagCbor.to_vec(value).map(Self::from_bytes)
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, AdError> {
        Codec::DagCbor.from_slice(&self.bytes)
    }

    /// Recompute the link of the block's bytes.
    pub fn computed_cid(&self) -> Cid {
        dag_cbor_link(&self.bytes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AdvertisementNode {
    #[serde(rename = "IsRm")]
    is_rm: bool,
    #[serde(rename = "Entries")]
    entries: Cid,
    #[serde(rename = "Metadata", with = "serde_bytes")]
    metadata: Vec<u8>,
    #[serde(rename = "Provider")]
    provider: String,
    #[serde(rename = "Addresses")]
    addresses: Vec<String>,
    #[serde(rename = "ContextID", with = "serde_bytes")]
    context_id: Vec<u8>,
    #[serde(rename = "Signature", with = "serde_bytes")]
    signature: Vec<u8>,
    #[serde(
        rename = "PreviousID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    previous_id: Option<Cid>,
    #[serde(
        rename = "ExtendedProvider",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    extended_provider: Option<ExtendedProviderNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExtendedProviderNode {
    #[serde(rename = "Override")]
    is_override: bool,
    #[serde(rename = "Providers")]
    providers: Vec<ProviderNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProviderNode {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Metadata", with = "serde_bytes")]
    metadata: Vec<u8>,
    #[serde(rename = "Override", default)]
    is_override: bool,
    #[serde(rename = "Addresses")]
    addresses: Vec<String>,
    #[serde(rename = "Signature", with = "serde_bytes")]
    signature: Vec<u8>,
}

impl From<&Advertisement> for AdvertisementNode {
    fn from(ad: &Advertisement) -> Self {
        Self {
            is_rm: ad.is_remove,
            entries: ad.entries,
            metadata: ad.metadata.clone(),
            provider: ad.provider.to_string(),
            addresses: addrs::to_strings(&ad.addresses),
            context_id: ad.context_id.clone(),
            signature: ad.signature.clone(),
            previous_id: ad.previous,
            extended_provider: ad.extended_providers.as_ref().map(|set| ExtendedProviderNode {
                is_override: set.is_override,
                providers: set.providers.iter().map(ProviderNode::from).collect(),
            }),
        }
    }
}

impl From<&ExtendedProvider> for ProviderNode {
    fn from(entry: &ExtendedProvider) -> Self {
        Self {
            id: entry.provider.to_string(),
            metadata: entry.metadata.clone(),
            is_override: entry.is_override,
            addresses: addrs::to_strings(&entry.addresses),
            signature: entry.signature.clone(),
        }
    }
}

impl TryFrom<AdvertisementNode> for Advertisement {
    type Error = AdError;

    fn try_from(node: AdvertisementNode) -> Result<Self, Self::Error> {
        let extended_providers = match node.extended_provider {
            Some(set) => Some(ExtendedProviders {
                is_override: set.is_override,
                providers: set
                    .providers
                    .into_iter()
                    .map(ExtendedProvider::try_from)
                    .collect::<Result<_, _>>()?,
            }),
            None => None,
        };

        Ok(Advertisement {
            previous: node.previous_id,
            provider: decode_peer_id("Provider", &node.provider)?,
            addresses: decode_addresses(&node.addresses)?,
            entries: node.entries,
            context_id: node.context_id,
            metadata: node.metadata,
            is_remove: node.is_rm,
            extended_providers,
            signature: node.signature,
        })
    }
}

impl TryFrom<ProviderNode> for ExtendedProvider {
    type Error = AdError;

    fn try_from(node: ProviderNode) -> Result<Self, Self::Error> {
        Ok(ExtendedProvider {
            provider: decode_peer_id("ID", &node.id)?,
            addresses: decode_addresses(&node.addresses)?,
            metadata: node.metadata,
            is_override: node.is_override,
            signature: node.signature,
        })
    }
}

pub(crate) fn encode_advertisement(ad: &Advertisement, codec: Codec) -> Result<Vec<u8>, AdError> {
    codec.to_vec(&AdvertisementNode::from(ad))
}

pub(crate) fn decode_advertisement(bytes: &[u8], codec: Codec) -> Result<Advertisement, AdError> {
    let node: AdvertisementNode = codec.from_slice(bytes)?;
    Advertisement::try_from(node)
}

fn decode_peer_id(field: &'static str, value: &str) -> Result<PeerId, AdError> {
    if value.is_empty() {
        return Err(AdError::Decode(format!("missing {field}")));
    }
    value
        .parse::<PeerId>()
        .map_err(|e| AdError::Decode(format!("invalid peer ID {value:?}: {e}")))
}

fn decode_addresses(values: &[String]) -> Result<Vec<Multiaddr>, AdError> {
    addrs::parse_all(values).map_err(|e| AdError::Decode(e.to_string()))
}
