//! Canonical signable payloads.
//!
//! The signed bytes are a versioned, tagged encoding of the signed fields:
//!
//! ```text
//! len(version) version kind
//! 0x01 presence [len(previous) previous]
//! 0x02 len(provider) provider
//! 0x03 count { len(addr) addr }*
//! 0x04 len(entries) entries
//! 0x05 len(context_id) context_id
//! 0x06 len(metadata) metadata
//! 0x07 is_remove
//! 0x08 is_override          (extended provider entries only)
//! ```
//!
//! Lengths and counts are big-endian `u32`. CIDs, peer IDs, and multiaddrs are
//! fed in their binary forms.

use crate::error::AdError;
use crate::identity::{open_signature, Identity};
use cid::Cid;
use libp2p_identity::PeerId;
use multiaddr::Multiaddr;

/// Version header of the canonical payload encoding.
pub const CANONICAL_VERSION: &[u8] = b"ipni-ad/v1";

const FIELD_PREVIOUS: u8 = 0x01;
const FIELD_PROVIDER: u8 = 0x02;
const FIELD_ADDRESSES: u8 = 0x03;
const FIELD_ENTRIES: u8 = 0x04;
const FIELD_CONTEXT_ID: u8 = 0x05;
const FIELD_METADATA: u8 = 0x06;
const FIELD_IS_REMOVE: u8 = 0x07;
const FIELD_OVERRIDE: u8 = 0x08;

/// Which record a payload is signed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Advertisement,
    ExtendedProvider,
}

impl PayloadKind {
    fn tag(self) -> u8 {
        match self {
            PayloadKind::Advertisement => 0xA1,
            PayloadKind::ExtendedProvider => 0xE1,
        }
    }
}

/// Borrowed view of the fields covered by a signature.
#[derive(Debug, Clone, Copy)]
pub struct SignableFields<'a> {
    pub previous: Option<&'a Cid>,
    pub provider: &'a PeerId,
    pub addresses: &'a [Multiaddr],
    pub entries: &'a Cid,
    pub context_id: &'a [u8],
    pub metadata: &'a [u8],
    pub is_remove: bool,
}

/// Serialize the signed fields into their canonical byte form.
pub fn canonicalize(kind: PayloadKind, fields: &SignableFields<'_>) -> Vec<u8> {
    let mut buf = Vec::new();
    feed_bytes(&mut buf, CANONICAL_VERSION);
    buf.push(kind.tag());

    buf.push(FIELD_PREVIOUS);
    feed_opt_bytes(&mut buf, fields.previous.map(|cid| cid.to_bytes()).as_deref());

    buf.push(FIELD_PROVIDER);
    feed_bytes(&mut buf, &fields.provider.to_bytes());

    buf.push(FIELD_ADDRESSES);
    feed_u32(&mut buf, fields.addresses.len() as u32);
    for addr in fields.addresses {
        feed_bytes(&mut buf, addr.as_ref());
    }

    buf.push(FIELD_ENTRIES);
    feed_bytes(&mut buf, &fields.entries.to_bytes());

    buf.push(FIELD_CONTEXT_ID);
    feed_bytes(&mut buf, fields.context_id);

    buf.push(FIELD_METADATA);
    feed_bytes(&mut buf, fields.metadata);

    buf.push(FIELD_IS_REMOVE);
    buf.push(u8::from(fields.is_remove));
    buf
}

/// Canonical payload of an extended provider entry, which also binds the
/// entry's own override flag.
pub fn canonicalize_entry(fields: &SignableFields<'_>, is_override: bool) -> Vec<u8> {
    let mut buf = canonicalize(PayloadKind::ExtendedProvider, fields);
    buf.push(FIELD_OVERRIDE);
    buf.push(u8::from(is_override));
    buf
}

pub(crate) fn sign_fields(
    identity: &Identity,
    kind: PayloadKind,
    fields: &SignableFields<'_>,
) -> Result<Vec<u8>, AdError> {
    identity.sign(&canonicalize(kind, fields))
}

/// Check a top-level signature and return the signer's peer ID.
///
/// Fails with `SignatureInvalid` unless the envelope is intact, covers exactly
/// these fields, and was produced by `fields.provider`.
pub(crate) fn verify_fields(
    kind: PayloadKind,
    fields: &SignableFields<'_>,
    signature: &[u8],
) -> Result<PeerId, AdError> {
    let opened = open_signature(signature)?;
    if !opened.covers(&canonicalize(kind, fields)) {
        return Err(AdError::SignatureInvalid);
    }
    let signer = opened.signer_peer_id();
    if signer != *fields.provider {
        return Err(AdError::SignatureInvalid);
    }
    Ok(signer)
}

fn feed_bytes(buf: &mut Vec<u8>, value: &[u8]) {
    feed_u32(buf, value.len() as u32);
    buf.extend_from_slice(value);
}

fn feed_opt_bytes(buf: &mut Vec<u8>, value: Option<&[u8]>) {
    match value {
        Some(val) => {
            buf.push(1);
            feed_bytes(buf, val);
        }
        None => buf.push(0),
    }
}

fn feed_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}
