//! Provider identities and enveloped signatures.
//!
//! An [`Identity`] wraps a libp2p keypair of any supported algorithm. Payloads are
//! signed by hashing them with SHA3-256 and sealing the digest in a libp2p
//! signed envelope; the envelope carries the signer's public key, so a verifier
//! can recover the signer's peer ID from the signature alone.

use crate::error::AdError;
use libp2p_core::SignedEnvelope;
use libp2p_identity::{KeyType, Keypair, PeerId, PublicKey};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::str::FromStr;

/// Domain separation string for advertisement signature envelopes.
pub const SIGNATURE_DOMAIN: &str = "indexer";

/// Payload type recorded in advertisement signature envelopes.
pub const SIGNATURE_PAYLOAD_TYPE: &[u8] = b"/indexer/ingest/adSignature";

/// Key algorithms a provider identity may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Ed25519,
    Secp256k1,
    Ecdsa,
    Rsa,
}

impl KeyAlgorithm {
    fn of(key_type: KeyType) -> Self {
        match key_type {
            KeyType::Ed25519 => KeyAlgorithm::Ed25519,
            KeyType::Secp256k1 => KeyAlgorithm::Secp256k1,
            KeyType::Ecdsa => KeyAlgorithm::Ecdsa,
            KeyType::RSA => KeyAlgorithm::Rsa,
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyAlgorithm::Ed25519 => "ed25519",
            KeyAlgorithm::Secp256k1 => "secp256k1",
            KeyAlgorithm::Ecdsa => "ecdsa",
            KeyAlgorithm::Rsa => "rsa",
        };
        f.write_str(name)
    }
}

impl FromStr for KeyAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ed25519" => Ok(KeyAlgorithm::Ed25519),
            "secp256k1" => Ok(KeyAlgorithm::Secp256k1),
            "ecdsa" => Ok(KeyAlgorithm::Ecdsa),
            "rsa" => Ok(KeyAlgorithm::Rsa),
            other => Err(format!("unknown key algorithm: {other}")),
        }
    }
}

/// A provider's keypair together with its derived peer ID.
#[derive(Clone)]
pub struct Identity {
    keypair: Keypair,
    peer_id: PeerId,
}

impl Identity {
    /// Generate a fresh identity.
    ///
    /// RSA identities can be decoded but not generated.
    pub fn generate(algorithm: KeyAlgorithm) -> Result<Self, AdError> {
        let keypair = match algorithm {
            KeyAlgorithm::Ed25519 => Keypair::generate_ed25519(),
            KeyAlgorithm::Secp256k1 => Keypair::generate_secp256k1(),
            KeyAlgorithm::Ecdsa => Keypair::generate_ecdsa(),
            KeyAlgorithm::Rsa => return Err(AdError::UnsupportedKeyAlgorithm(algorithm)),
        };
        Ok(Self::from_keypair(keypair))
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        let peer_id = keypair.public().to_peer_id();
        Self { keypair, peer_id }
    }

    /// Decode a libp2p protobuf-encoded private key.
    pub fn from_protobuf_encoding(bytes: &[u8]) -> Result<Self, AdError> {
        let keypair = Keypair::from_protobuf_encoding(bytes)
            .map_err(|e| AdError::InvalidKeyEncoding(e.to_string()))?;
        Ok(Self::from_keypair(keypair))
    }

    /// Build a deterministic Ed25519 identity from a 32-byte secret seed.
    pub fn from_ed25519_seed(seed: [u8; 32]) -> Result<Self, AdError> {
        let keypair = Keypair::ed25519_from_bytes(seed)
            .map_err(|e| AdError::InvalidKeyEncoding(e.to_string()))?;
        Ok(Self::from_keypair(keypair))
    }

    pub fn to_protobuf_encoding(&self) -> Result<Vec<u8>, AdError> {
        self.keypair
            .to_protobuf_encoding()
            .map_err(|e| AdError::InvalidKeyEncoding(e.to_string()))
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public()
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::of(self.keypair.key_type())
    }

    /// Sign `payload`, returning the protobuf encoding of the signed envelope.
    pub fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, AdError> {
        let digest = payload_digest(payload);
        let envelope = SignedEnvelope::new(
            &self.keypair,
            SIGNATURE_DOMAIN.to_string(),
            SIGNATURE_PAYLOAD_TYPE.to_vec(),
            digest.to_vec(),
        )
        .map_err(|e| AdError::Signing(e.to_string()))?;
        Ok(envelope.into_protobuf_encoding())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("peer_id", &self.peer_id)
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

/// Derive the peer ID of a public key.
pub fn peer_id_of(public_key: &PublicKey) -> PeerId {
    public_key.to_peer_id()
}

/// A signature envelope whose own signature has been checked.
#[derive(Debug, Clone)]
pub struct OpenedSignature {
    pub signer: PublicKey,
    pub digest: Vec<u8>,
}

impl OpenedSignature {
    pub fn signer_peer_id(&self) -> PeerId {
        peer_id_of(&self.signer)
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(&self.digest)
    }

    /// Whether the sealed digest is the digest of `payload`.
    pub fn covers(&self, payload: &[u8]) -> bool {
        self.digest.as_slice() == payload_digest(payload).as_slice()
    }
}

/// Decode a signature envelope and check it under the advertisement domain.
pub fn open_signature(signature: &[u8]) -> Result<OpenedSignature, AdError> {
    let envelope =
        SignedEnvelope::from_protobuf_encoding(signature).map_err(|_| AdError::SignatureInvalid)?;
    let (digest, signer) = envelope
        .payload_and_signing_key(SIGNATURE_DOMAIN.to_string(), SIGNATURE_PAYLOAD_TYPE)
        .map_err(|_| AdError::SignatureInvalid)?;
    Ok(OpenedSignature {
        signer: signer.clone(),
        digest: digest.to_vec(),
    })
}

/// Check that `signature` was produced over `payload` by the key behind `signer`.
pub fn verify_payload(signer: &PeerId, payload: &[u8], signature: &[u8]) -> bool {
    match open_signature(signature) {
        Ok(opened) => opened.signer_peer_id() == *signer && opened.covers(payload),
        Err(_) => false,
    }
}

fn payload_digest(payload: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(payload);
    hasher.finalize().into()
}
