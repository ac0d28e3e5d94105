//! Signed IPNI advertisement records.
//!
//! This crate builds, signs, links, and verifies the advertisement records a
//! content provider publishes to announce which content it holds, where it can
//! be retrieved from, and with which transport metadata. Records are encoded as
//! DAG-CBOR so their bytes can be content-addressed and chained through
//! `PreviousID`.
//!
//! # Example
//!
//! ```
//! use ipni_ad::{addrs, verify, AdBuilder, Identity};
//!
//! let identity = Identity::from_ed25519_seed([7u8; 32]).unwrap();
//! let provider = identity.peer_id();
//! let addresses = addrs::parse_all(["/ip4/12.34.56.78/tcp/999/ws"]).unwrap();
//!
//! let mut builder = AdBuilder::new(identity, addresses);
//! builder
//!     .with_context_id(b"ctx1".to_vec())
//!     .unwrap()
//!     .with_metadata(vec![0x90, 0x20])
//!     .unwrap();
//! let ad = builder.build_and_sign().unwrap();
//!
//! let verified = verify(&ad.encode().unwrap()).unwrap();
//! assert_eq!(verified.signer, provider);
//! ```

pub mod addrs;
mod advertisement;
mod canonical;
mod chain;
mod entry_chunk;
mod error;
mod extended;
mod identity;
pub mod metadata;
mod schema;
mod validate;
mod verify;

pub use advertisement::{AdBuilder, Advertisement};
pub use canonical::{
    canonicalize, canonicalize_entry, PayloadKind, SignableFields, CANONICAL_VERSION,
};
pub use chain::{verify_chain, AdChain};
pub use entry_chunk::{
    build_entry_chain, calculate_dag_cbor_size, EntryChunk, MAX_ENTRY_CHUNK_CHAIN_LENGTH,
    RECOMMENDED_MAX_BLOCK_BYTES,
};
pub use error::AdError;
pub use extended::{
    ExtendedProvider, ExtendedProviderInfo, ExtendedProviders, ResolvedProvider,
};
pub use identity::{
    open_signature, peer_id_of, verify_payload, Identity, KeyAlgorithm, OpenedSignature,
    SIGNATURE_DOMAIN, SIGNATURE_PAYLOAD_TYPE,
};
pub use schema::{no_entries, Block, Codec, DAG_CBOR, DAG_JSON, RAW};
pub use validate::{
    validate, validate_with_limits, ValidationError, ValidationLimits, MAX_CONTEXT_ID_LEN,
    MAX_METADATA_LEN,
};
pub use verify::{
    verify, verify_advertisement, verify_encoded, verify_with_limits, VerifiedAdvertisement,
};

pub use cid::Cid;
pub use libp2p_identity::PeerId;
pub use multiaddr::Multiaddr;
