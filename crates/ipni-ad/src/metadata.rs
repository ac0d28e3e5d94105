//! Transport metadata carried in the `Metadata` field.
//!
//! Metadata starts with the varint multicodec of the retrieval transport. The
//! graphsync transport appends a DAG-CBOR payload describing the Filecoin deal.

use crate::error::AdError;
use cid::Cid;
use serde::{Deserialize, Serialize};

/// Multicodec of the bitswap transport.
pub const BITSWAP_CODE: u64 = 0x0900;
/// Multicodec of the graphsync (Filecoin v1) transport.
pub const GRAPHSYNC_FILECOIN_V1_CODE: u64 = 0x0910;
/// Multicodec of the IPFS trustless HTTP gateway transport.
pub const HTTP_CODE: u64 = 0x3D_0000;

/// Retrieval transport a provider offers for the advertised content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMetadata {
    Bitswap,
    Http,
    GraphsyncFilecoinV1 {
        piece_cid: Cid,
        verified_deal: bool,
        fast_retrieval: bool,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct GraphsyncPayload {
    #[serde(rename = "PieceCID")]
    piece_cid: Cid,
    #[serde(rename = "VerifiedDeal")]
    verified_deal: bool,
    #[serde(rename = "FastRetrieval")]
    fast_retrieval: bool,
}

impl TransportMetadata {
    pub fn protocol_code(&self) -> u64 {
        match self {
            TransportMetadata::Bitswap => BITSWAP_CODE,
            TransportMetadata::Http => HTTP_CODE,
            TransportMetadata::GraphsyncFilecoinV1 { .. } => GRAPHSYNC_FILECOIN_V1_CODE,
        }
    }

    /// Encode to the bytes stored in an advertisement's `Metadata`.
    pub fn encode(&self) -> Result<Vec<u8>, AdError> {
        let mut out = Vec::new();
        write_uvarint(&mut out, self.protocol_code());
        if let TransportMetadata::GraphsyncFilecoinV1 {
            piece_cid,
            verified_deal,
            fast_retrieval,
        } = self
        {
            let payload = GraphsyncPayload {
                piece_cid: *piece_cid,
                verified_deal: *verified_deal,
                fast_retrieval: *fast_retrieval,
            };
            let bytes = serde_ipld_dagcbor::to_vec(&payload)
                .map_err(|e| AdError::Encode(e.to_string()))?;
            out.extend_from_slice(&bytes);
        }
        Ok(out)
    }

    /// Decode metadata bytes; unknown transports are rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self, AdError> {
        let (code, rest) = read_uvarint(bytes)?;
        match code {
            BITSWAP_CODE => Ok(TransportMetadata::Bitswap),
            HTTP_CODE => Ok(TransportMetadata::Http),
            GRAPHSYNC_FILECOIN_V1_CODE => {
                let payload: GraphsyncPayload = serde_ipld_dagcbor::from_slice(rest)
                    .map_err(|e| AdError::MalformedMetadata(e.to_string()))?;
                Ok(TransportMetadata::GraphsyncFilecoinV1 {
                    piece_cid: payload.piece_cid,
                    verified_deal: payload.verified_deal,
                    fast_retrieval: payload.fast_retrieval,
                })
            }
            other => Err(AdError::MalformedMetadata(format!(
                "unknown transport code {other:#x}"
            ))),
        }
    }
}

fn write_uvarint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

fn read_uvarint(bytes: &[u8]) -> Result<(u64, &[u8]), AdError> {
    let mut value = 0u64;
    for (idx, byte) in bytes.iter().enumerate() {
        if idx >= 9 {
            return Err(AdError::MalformedMetadata(
                "varint exceeds 64-bit width".to_string(),
            ));
        }
        value |= u64::from(byte & 0x7F) << (7 * idx);
        if byte & 0x80 == 0 {
            return Ok((value, &bytes[idx + 1..]));
        }
    }
    Err(AdError::MalformedMetadata("truncated varint".to_string()))
}
