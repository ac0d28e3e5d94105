//! Structural validation of advertisement records.
//!
//! Validation never dereferences `PreviousID` or `Entries`; it only checks that
//! the record is well-formed on its own.

use crate::advertisement::Advertisement;
use crate::schema::{no_entries, DAG_CBOR, DAG_JSON, IDENTITY_HASH};
use cid::Cid;
use libp2p_identity::PeerId;
use thiserror::Error;

/// Maximum context ID length accepted by indexers.
pub const MAX_CONTEXT_ID_LEN: usize = 64;

/// Maximum metadata length accepted by indexers.
pub const MAX_METADATA_LEN: usize = 1024;

/// Size bounds applied during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    pub max_context_id_len: usize,
    pub max_metadata_len: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_context_id_len: MAX_CONTEXT_ID_LEN,
            max_metadata_len: MAX_METADATA_LEN,
        }
    }
}

/// Reasons a record fails structural validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("context ID is empty and the record is not a removal")]
    EmptyContextId,

    #[error("advertisement has no addresses")]
    EmptyAddresses,

    #[error("{field} link {link} is malformed: {reason}")]
    MalformedLink {
        field: &'static str,
        link: Cid,
        reason: String,
    },

    #[error("extended provider {provider} restates the top-level provider with different addresses")]
    ExtendedProviderConflict { provider: PeerId },

    #[error("context ID is {len} bytes, limit is {limit}")]
    OversizedContextId { len: usize, limit: usize },

    #[error("metadata is {len} bytes, limit is {limit}")]
    OversizedMetadata { len: usize, limit: usize },

    #[error("removal records cannot carry extended providers")]
    RemovalWithExtendedProviders,

    #[error("removal records must carry the no-entries sentinel and empty metadata")]
    RemovalWithPayload,

    #[error("overriding extended provider set does not list top-level provider {provider}")]
    MissingTopLevelProvider { provider: PeerId },

    #[error("overriding extended provider {provider} has no addresses")]
    EmptyExtendedProviderAddresses { provider: PeerId },
}

/// Validate a record with the default limits.
pub fn validate(ad: &Advertisement) -> Result<(), ValidationError> {
    validate_with_limits(ad, &ValidationLimits::default())
}

pub fn validate_with_limits(
    ad: &Advertisement,
    limits: &ValidationLimits,
) -> Result<(), ValidationError> {
    if ad.addresses.is_empty() {
        return Err(ValidationError::EmptyAddresses);
    }
    if ad.context_id.is_empty() && !ad.is_remove {
        return Err(ValidationError::EmptyContextId);
    }
    if ad.context_id.len() > limits.max_context_id_len {
        return Err(ValidationError::OversizedContextId {
            len: ad.context_id.len(),
            limit: limits.max_context_id_len,
        });
    }
    if ad.metadata.len() > limits.max_metadata_len {
        return Err(ValidationError::OversizedMetadata {
            len: ad.metadata.len(),
            limit: limits.max_metadata_len,
        });
    }

    if let Some(previous) = &ad.previous {
        check_previous_link(previous)?;
    }
    check_entries_link(&ad.entries)?;

    if ad.is_remove {
        if ad.extended_providers.is_some() {
            return Err(ValidationError::RemovalWithExtendedProviders);
        }
        if ad.entries != no_entries() || !ad.metadata.is_empty() {
            return Err(ValidationError::RemovalWithPayload);
        }
    }

    let Some(set) = &ad.extended_providers else {
        return Ok(());
    };

    for entry in &set.providers {
        if entry.metadata.len() > limits.max_metadata_len {
            return Err(ValidationError::OversizedMetadata {
                len: entry.metadata.len(),
                limit: limits.max_metadata_len,
            });
        }
        let overrides = set.overrides(entry);
        if overrides && entry.addresses.is_empty() {
            return Err(ValidationError::EmptyExtendedProviderAddresses {
                provider: entry.provider,
            });
        }
        if entry.provider == ad.provider
            && !overrides
            && !entry.addresses.is_empty()
            && entry.addresses != ad.addresses
        {
            return Err(ValidationError::ExtendedProviderConflict {
                provider: entry.provider,
            });
        }
    }

    // An overriding set replaces the provider list outright, so the top-level
    // provider must still be reachable through it.
    if set.is_override && set.find(&ad.provider).is_none() {
        return Err(ValidationError::MissingTopLevelProvider {
            provider: ad.provider,
        });
    }

    Ok(())
}

fn check_previous_link(link: &Cid) -> Result<(), ValidationError> {
    if link.hash().code() == IDENTITY_HASH {
        return Err(malformed("previous", link, "identity multihash"));
    }
    if link.codec() != DAG_CBOR && link.codec() != DAG_JSON {
        return Err(malformed(
            "previous",
            link,
            &format!("codec {:#x} is not dag-cbor or dag-json", link.codec()),
        ));
    }
    Ok(())
}

fn check_entries_link(link: &Cid) -> Result<(), ValidationError> {
    if link.hash().code() == IDENTITY_HASH && !link.hash().digest().is_empty() {
        return Err(malformed("entries", link, "inline identity data"));
    }
    Ok(())
}

fn malformed(field: &'static str, link: &Cid, reason: &str) -> ValidationError {
    ValidationError::MalformedLink {
        field,
        link: *link,
        reason: reason.to_string(),
    }
}
