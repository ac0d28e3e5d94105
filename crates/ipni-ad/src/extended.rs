//! Extended providers.
//!
//! An extended provider is another peer that can serve an advertisement's
//! content. Each entry is signed by its own key over its own identity, addresses,
//! metadata and override flag, bound to the advertisement's context ID. The top-level
//! advertisement signature does not cover these entries, so an operator can sign
//! an entry without co-signing the whole advertisement.

use crate::canonical::{canonicalize_entry, SignableFields};
use crate::error::AdError;
use crate::identity::{open_signature, Identity};
use crate::schema::no_entries;
use crate::validate::ValidationError;
use libp2p_identity::PeerId;
use multiaddr::Multiaddr;

/// A signed extended provider entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedProvider {
    pub(crate) provider: PeerId,
    pub(crate) addresses: Vec<Multiaddr>,
    pub(crate) metadata: Vec<u8>,
    pub(crate) is_override: bool,
    pub(crate) signature: Vec<u8>,
}

impl ExtendedProvider {
    /// Sign an entry for the advertisements sharing `context_id`.
    ///
    /// Empty `addresses` or `metadata` inherit the top-level provider's values;
    /// an overriding entry must bring its own addresses.
    pub fn sign(
        identity: &Identity,
        context_id: &[u8],
        addresses: Vec<Multiaddr>,
        metadata: Vec<u8>,
        is_override: bool,
    ) -> Result<Self, AdError> {
        let provider = identity.peer_id();
        if is_override && addresses.is_empty() {
            return Err(ValidationError::EmptyExtendedProviderAddresses { provider }.into());
        }

        let mut entry = Self {
            provider,
            addresses,
            metadata,
            is_override,
            signature: Vec::new(),
        };
        entry.signature = identity.sign(&entry.signable_bytes(context_id))?;
        Ok(entry)
    }

    pub fn provider(&self) -> &PeerId {
        &self.provider
    }

    pub fn addresses(&self) -> &[Multiaddr] {
        &self.addresses
    }

    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    pub fn is_override(&self) -> bool {
        self.is_override
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Canonical bytes this entry's signature covers.
    pub fn signable_bytes(&self, context_id: &[u8]) -> Vec<u8> {
        let entries = no_entries();
        canonicalize_entry(
            &SignableFields {
                previous: None,
                provider: &self.provider,
                addresses: &self.addresses,
                entries: &entries,
                context_id,
                metadata: &self.metadata,
                is_remove: false,
            },
            self.is_override,
        )
    }

    /// Verify this entry's own signature for `context_id`.
    pub fn verify(&self, context_id: &[u8]) -> Result<(), AdError> {
        let opened =
            open_signature(&self.signature).map_err(|_| AdError::ExtendedProviderSignatureInvalid {
                provider: self.provider,
            })?;

        let signer = opened.signer_peer_id();
        if signer != self.provider {
            return Err(AdError::ExtendedProviderSignatureMismatch {
                provider: self.provider,
                signer,
            });
        }
        if !opened.covers(&self.signable_bytes(context_id)) {
            return Err(AdError::ExtendedProviderSignatureInvalid {
                provider: self.provider,
            });
        }
        Ok(())
    }
}

/// An extended provider that the advertisement builder signs on the operator's behalf.
#[derive(Debug, Clone)]
pub struct ExtendedProviderInfo {
    pub identity: Identity,
    pub addresses: Vec<Multiaddr>,
    pub metadata: Vec<u8>,
    pub is_override: bool,
}

impl ExtendedProviderInfo {
    pub fn new(identity: Identity, addresses: Vec<Multiaddr>, metadata: Vec<u8>) -> Self {
        Self {
            identity,
            addresses,
            metadata,
            is_override: false,
        }
    }

    pub fn with_override(mut self, is_override: bool) -> Self {
        self.is_override = is_override;
        self
    }

    pub fn sign(&self, context_id: &[u8]) -> Result<ExtendedProvider, AdError> {
        ExtendedProvider::sign(
            &self.identity,
            context_id,
            self.addresses.clone(),
            self.metadata.clone(),
            self.is_override,
        )
    }
}

/// The extended provider set attached to an advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedProviders {
    pub(crate) providers: Vec<ExtendedProvider>,
    pub(crate) is_override: bool,
}

impl ExtendedProviders {
    pub fn new(providers: Vec<ExtendedProvider>, is_override: bool) -> Self {
        Self {
            providers,
            is_override,
        }
    }

    pub fn providers(&self) -> &[ExtendedProvider] {
        &self.providers
    }

    pub fn is_override(&self) -> bool {
        self.is_override
    }

    /// Whether `entry` replaces rather than extends the top-level provider's values.
    pub fn overrides(&self, entry: &ExtendedProvider) -> bool {
        self.is_override || entry.is_override
    }

    pub fn find(&self, provider: &PeerId) -> Option<&ExtendedProvider> {
        self.providers.iter().find(|entry| entry.provider == *provider)
    }
}

/// A provider a retrieval client can contact, after inheritance is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProvider {
    pub provider: PeerId,
    pub addresses: Vec<Multiaddr>,
    pub metadata: Vec<u8>,
}

/// Resolve the providers a client should try for one advertisement.
///
/// Non-overriding entries with empty addresses or metadata inherit the
/// top-level values; overriding entries carry only their own. The top-level
/// provider is listed first unless any entry overrides or an entry restates it.
pub(crate) fn resolve(
    provider: &PeerId,
    addresses: &[Multiaddr],
    metadata: &[u8],
    extended: Option<&ExtendedProviders>,
) -> Vec<ResolvedProvider> {
    let top_level = ResolvedProvider {
        provider: *provider,
        addresses: addresses.to_vec(),
        metadata: metadata.to_vec(),
    };
    let Some(set) = extended else {
        return vec![top_level];
    };

    let any_override = set.providers.iter().any(|entry| set.overrides(entry));
    let mut resolved = Vec::with_capacity(set.providers.len() + 1);
    if !any_override && set.find(provider).is_none() {
        resolved.push(top_level);
    }
    for entry in &set.providers {
        let inherit = !set.overrides(entry);
        resolved.push(ResolvedProvider {
            provider: entry.provider,
            addresses: if inherit && entry.addresses.is_empty() {
                addresses.to_vec()
            } else {
                entry.addresses.clone()
            },
            metadata: if inherit && entry.metadata.is_empty() {
                metadata.to_vec()
            } else {
                entry.metadata.clone()
            },
        });
    }
    resolved
}
