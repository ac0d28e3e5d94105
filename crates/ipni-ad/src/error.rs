//! Error taxonomy shared by every advertisement operation.

use crate::identity::KeyAlgorithm;
use crate::validate::ValidationError;
use cid::Cid;
use libp2p_identity::PeerId;
use thiserror::Error;

/// Errors produced while building, signing, encoding, or verifying advertisements.
///
/// Every failure is terminal: signing and verification are deterministic, so a
/// failed operation is never retried by this crate.
#[derive(Debug, Error)]
pub enum AdError {
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    #[error("cannot generate keys for algorithm {0}")]
    UnsupportedKeyAlgorithm(KeyAlgorithm),

    #[error("malformed multiaddr {input:?}: {reason}")]
    MalformedAddress { input: String, reason: String },

    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    #[error("advertisement builder is already finalized")]
    BuilderFinalized,

    #[error("extended provider {provider} carries a signature by {signer}")]
    ExtendedProviderSignatureMismatch { provider: PeerId, signer: PeerId },

    #[error("extended provider {provider} signature does not cover its fields")]
    ExtendedProviderSignatureInvalid { provider: PeerId },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("signature invalid")]
    SignatureInvalid,

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("advertisement {index} has broken link: expected {expected:?}, got {found:?}")]
    BrokenChain {
        index: usize,
        expected: Option<Cid>,
        found: Option<Cid>,
    },

    #[error("block {index} is addressed as {claimed} but its bytes hash to {actual}")]
    BlockCidMismatch {
        index: usize,
        claimed: Cid,
        actual: Cid,
    },

    #[error("entry chunk chain of {chunks} chunks exceeds the limit of {max}")]
    EntryChainTooLong { chunks: usize, max: usize },

    #[error("entry of {len} bytes does not fit an entry chunk of at most {max} bytes")]
    EntryTooLarge { len: usize, max: usize },
}
