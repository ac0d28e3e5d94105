//! Advertisement chains linked through `PreviousID`.

use crate::advertisement::{AdBuilder, Advertisement};
use crate::error::AdError;
use crate::schema::Block;
use crate::validate::ValidationLimits;
use crate::verify::verify_advertisement;
use cid::Cid;

/// A publisher's local chain of encoded advertisements, oldest first.
#[derive(Debug, Clone, Default)]
pub struct AdChain {
    blocks: Vec<Block>,
}

impl AdChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link of the most recent advertisement.
    pub fn head(&self) -> Option<Cid> {
        self.blocks.last().map(|block| block.cid)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Link `builder` to the current head, sign it, and append it.
    ///
    /// Returns the link of the new head.
    pub fn publish(&mut self, builder: &mut AdBuilder) -> Result<Cid, AdError> {
        builder.with_previous(self.head())?;
        let ad = builder.build_and_sign()?;
        let block = ad.to_block()?;
        let cid = block.cid;

        tracing::debug!(
            index = self.blocks.len(),
            head = %cid,
            previous = ?ad.previous(),
            "published advertisement"
        );
        self.blocks.push(block);
        Ok(cid)
    }

    /// Decode the advertisement at `index`.
    pub fn advertisement(&self, index: usize) -> Option<Result<Advertisement, AdError>> {
        self.blocks
            .get(index)
            .map(|block| Advertisement::decode(&block.bytes))
    }
}

/// Verify a chain of encoded advertisements, oldest first.
///
/// Each block must hash to its claimed link, verify on its own, and point at
/// the previous block through `PreviousID`; the first block must have none.
pub fn verify_chain(blocks: &[Block]) -> Result<(), AdError> {
    let limits = ValidationLimits::default();
    let mut expected: Option<Cid> = None;

    for (index, block) in blocks.iter().enumerate() {
        let actual = block.computed_cid();
        if actual != block.cid {
            return Err(AdError::BlockCidMismatch {
                index,
                claimed: block.cid,
                actual,
            });
        }

        let ad = Advertisement::decode(&block.bytes)?;
        verify_advertisement(&ad, &limits)?;

        if ad.previous() != expected.as_ref() {
            return Err(AdError::BrokenChain {
                index,
                expected,
                found: ad.previous().copied(),
            });
        }
        expected = Some(block.cid);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use multiaddr::Multiaddr;

    fn builder(context: &str) -> AdBuilder {
        let identity = Identity::from_ed25519_seed([5u8; 32]).unwrap();
        let addresses: Vec<Multiaddr> = vec!["/ip4/12.34.56.78/tcp/999/ws".parse().unwrap()];
        let mut builder = AdBuilder::new(identity, addresses);
        builder
            .with_context_id(context.as_bytes().to_vec())
            .unwrap();
        builder
    }

    #[test]
    fn test_publish_links_to_previous_head() {
        let mut chain = AdChain::new();
        assert!(chain.head().is_none());

        let first = chain.publish(&mut builder("a")).unwrap();
        let second = chain.publish(&mut builder("b")).unwrap();

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.head(), Some(second));

        let first_ad = chain.advertisement(0).unwrap().unwrap();
        let second_ad = chain.advertisement(1).unwrap().unwrap();
        assert!(first_ad.previous().is_none());
        assert_eq!(second_ad.previous(), Some(&first));
    }

    #[test]
    fn test_verify_valid_chain() {
        let mut chain = AdChain::new();
        for context in ["a", "b", "c"] {
            chain.publish(&mut builder(context)).unwrap();
        }
        assert!(verify_chain(chain.blocks()).is_ok());
    }

    #[test]
    fn test_empty_chain_is_valid() {
        assert!(verify_chain(&[]).is_ok());
    }

    #[test]
    fn test_detect_broken_link() {
        let mut chain = AdChain::new();
        for context in ["a", "b", "c"] {
            chain.publish(&mut builder(context)).unwrap();
        }

        let mut blocks = chain.blocks().to_vec();
        blocks.remove(1);

        assert!(matches!(
            verify_chain(&blocks),
            Err(AdError::BrokenChain { index: 1, .. })
        ));
    }

    #[test]
    fn test_detect_tampered_block() {
        let mut chain = AdChain::new();
        chain.publish(&mut builder("a")).unwrap();

        let mut blocks = chain.blocks().to_vec();
        let last = blocks[0].bytes.len() - 1;
        blocks[0].bytes[last] ^= 0x01;

        assert!(matches!(
            verify_chain(&blocks),
            Err(AdError::BlockCidMismatch { index: 0, .. })
        ));
    }

    #[test]
    fn test_signed_builder_cannot_be_republished() {
        let mut chain = AdChain::new();
        let mut b = builder("a");
        chain.publish(&mut b).unwrap();

        assert!(matches!(
            chain.publish(&mut b),
            Err(AdError::BuilderFinalized)
        ));
        assert_eq!(chain.len(), 1);
    }
}
