//! Entry chunks: the linked list of multihash batches an advertisement's
//! `Entries` link points at.
//!
//! The encoded size of a chunk is known exactly before encoding, so a publisher
//! can fill chunks up to a block size budget without trial encodes.

use crate::error::AdError;
use crate::schema::{no_entries, Block};
use cid::multihash::Multihash;
use cid::Cid;
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

/// Recommended upper bound for a single encoded block.
pub const RECOMMENDED_MAX_BLOCK_BYTES: usize = 1_048_576;

/// How many `Next` links an indexer follows for one advertisement.
pub const MAX_ENTRY_CHUNK_CHAIN_LENGTH: usize = 400;

const ENTRIES_KEY: &str = "Entries";
const NEXT_KEY: &str = "Next";
// CBOR tag 42, as two bytes.
const CID_TAG_LEN: usize = 2;

#[derive(Debug, Serialize, Deserialize)]
struct EntryChunkNode {
    #[serde(rename = "Next", default, skip_serializing_if = "Option::is_none")]
    next: Option<Cid>,
    #[serde(rename = "Entries")]
    entries: Vec<ByteBuf>,
}

/// A batch of multihashes with an optional link to the next batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryChunk {
    entries: Vec<Vec<u8>>,
    next: Option<Cid>,
    overhead: usize,
    entries_len: usize,
}

impl EntryChunk {
    pub fn new(next: Option<Cid>) -> Self {
        Self {
            entries: Vec::new(),
            overhead: partial_overhead(next.as_ref()),
            next,
            entries_len: 0,
        }
    }

    pub fn from_multihashes<'a, I>(multihashes: I) -> Self
    where
        I: IntoIterator<Item = &'a Multihash<64>>,
    {
        let mut chunk = Self::new(None);
        for mh in multihashes {
            chunk.add(mh.to_bytes());
        }
        chunk
    }

    pub fn from_cids<'a, I>(cids: I) -> Self
    where
        I: IntoIterator<Item = &'a Cid>,
    {
        Self::from_multihashes(cids.into_iter().map(Cid::hash))
    }

    /// Append a multihash in its byte form.
    pub fn add(&mut self, entry: Vec<u8>) {
        self.entries_len += bytes_len(entry.len());
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[Vec<u8>] {
        &self.entries
    }

    pub fn next(&self) -> Option<&Cid> {
        self.next.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact length of this chunk's DAG-CBOR encoding.
    pub fn calculate_encoded_size(&self) -> usize {
        self.overhead + self.entries_len + head_len(self.entries.len() as u64)
    }

    /// Whether one more entry of `entry_len` bytes keeps the chunk within `max_bytes`.
    fn fits(&self, entry_len: usize, max_bytes: usize) -> bool {
        let grown = self.overhead
            + self.entries_len
            + bytes_len(entry_len)
            + head_len(self.entries.len() as u64 + 1);
        grown <= max_bytes
    }

    /// Encode to a content-addressed DAG-CBOR block.
    pub fn export(&self) -> Result<Block, AdError> {
        Block::encode(&EntryChunkNode {
            next: self.next,
            entries: self.entries.iter().cloned().map(ByteBuf::from).collect(),
        })
    }

    /// Decode a chunk from its DAG-CBOR block.
    pub fn import(block: &Block) -> Result<Self, AdError> {
        let node: EntryChunkNode = block.decode()?;
        let mut chunk = Self::new(node.next);
        for entry in node.entries {
            chunk.add(entry.into_vec());
        }
        Ok(chunk)
    }
}

/// Exact DAG-CBOR length of an entry chunk with these entries and `next` link.
pub fn calculate_dag_cbor_size(entries: &[Vec<u8>], next: Option<&Cid>) -> usize {
    partial_overhead(next)
        + head_len(entries.len() as u64)
        + entries.iter().map(|e| bytes_len(e.len())).sum::<usize>()
}

/// Split multihashes into a chain of chunks, each at most `max_block_bytes`.
///
/// Chunks are exported in the order they are filled; each links to the one
/// exported before it. Returns the link of the last chunk, which is the value
/// for an advertisement's `Entries`, and every block. No entries yields the
/// no-entries sentinel and no blocks. Fails with `EntryTooLarge` when an entry
/// cannot fit a fresh chunk on its own.
pub fn build_entry_chain<I>(
    multihashes: I,
    max_block_bytes: usize,
) -> Result<(Cid, Vec<Block>), AdError>
where
    I: IntoIterator<Item = Vec<u8>>,
{
    let mut blocks: Vec<Block> = Vec::new();
    let mut chunk = EntryChunk::new(None);

    for entry in multihashes {
        if !chunk.fits(entry.len(), max_block_bytes) {
            if chunk.is_empty() {
                return Err(too_large(&entry, max_block_bytes));
            }
            let block = chunk.export()?;
            chunk = EntryChunk::new(Some(block.cid));
            blocks.push(block);
            if blocks.len() >= MAX_ENTRY_CHUNK_CHAIN_LENGTH {
                return Err(AdError::EntryChainTooLong {
                    chunks: blocks.len() + 1,
                    max: MAX_ENTRY_CHUNK_CHAIN_LENGTH,
                });
            }
            if !chunk.fits(entry.len(), max_block_bytes) {
                return Err(too_large(&entry, max_block_bytes));
            }
        }
        chunk.add(entry);
    }

    if chunk.is_empty() {
        return Ok((no_entries(), blocks));
    }
    let block = chunk.export()?;
    let head = block.cid;
    blocks.push(block);

    tracing::debug!(chunks = blocks.len(), %head, "built entry chunk chain");
    Ok((head, blocks))
}

fn too_large(entry: &[u8], max: usize) -> AdError {
    AdError::EntryTooLarge {
        len: entry.len(),
        max,
    }
}

/// Fixed cost of a chunk without its entries array.
fn partial_overhead(next: Option<&Cid>) -> usize {
    match next {
        Some(cid) => {
            head_len(2)
                + text_len(NEXT_KEY)
                + CID_TAG_LEN
                + bytes_len(cid.to_bytes().len() + 1)
                + text_len(ENTRIES_KEY)
        }
        None => head_len(1) + text_len(ENTRIES_KEY),
    }
}

fn text_len(value: &str) -> usize {
    head_len(value.len() as u64) + value.len()
}

fn bytes_len(len: usize) -> usize {
    head_len(len as u64) + len
}

/// Length of a CBOR major-type head carrying `value`.
fn head_len(value: u64) -> usize {
    match value {
        0..=23 => 1,
        24..=0xFF => 2,
        0x100..=0xFFFF => 3,
        0x1_0000..=0xFFFF_FFFF => 5,
        _ => 9,
    }
}
