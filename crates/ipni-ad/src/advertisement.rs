//! The advertisement record and its builder.

use crate::canonical::{canonicalize, sign_fields, verify_fields, PayloadKind, SignableFields};
use crate::error::AdError;
use crate::extended::{
    resolve, ExtendedProvider, ExtendedProviderInfo, ExtendedProviders, ResolvedProvider,
};
use crate::identity::Identity;
use crate::schema::{
    dag_cbor_link, decode_advertisement, encode_advertisement, no_entries, Block, Codec,
};
use crate::validate::validate;
use cid::Cid;
use libp2p_identity::PeerId;
use multiaddr::Multiaddr;

/// A signed, immutable advertisement record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub(crate) previous: Option<Cid>,
    pub(crate) provider: PeerId,
    pub(crate) addresses: Vec<Multiaddr>,
    pub(crate) entries: Cid,
    pub(crate) context_id: Vec<u8>,
    pub(crate) metadata: Vec<u8>,
    pub(crate) is_remove: bool,
    pub(crate) extended_providers: Option<ExtendedProviders>,
    pub(crate) signature: Vec<u8>,
}

impl Advertisement {
    pub fn previous(&self) -> Option<&Cid> {
        self.previous.as_ref()
    }

    pub fn provider(&self) -> &PeerId {
        &self.provider
    }

    pub fn addresses(&self) -> &[Multiaddr] {
        &self.addresses
    }

    pub fn entries(&self) -> &Cid {
        &self.entries
    }

    pub fn context_id(&self) -> &[u8] {
        &self.context_id
    }

    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    pub fn is_remove(&self) -> bool {
        self.is_remove
    }

    pub fn extended_providers(&self) -> Option<&ExtendedProviders> {
        self.extended_providers.as_ref()
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Whether this record removes every advertisement of its provider.
    pub fn is_wildcard_removal(&self) -> bool {
        self.is_remove && self.context_id.is_empty()
    }

    pub fn signable_fields(&self) -> SignableFields<'_> {
        SignableFields {
            previous: self.previous.as_ref(),
            provider: &self.provider,
            addresses: &self.addresses,
            entries: &self.entries,
            context_id: &self.context_id,
            metadata: &self.metadata,
            is_remove: self.is_remove,
        }
    }

    /// Canonical bytes covered by the top-level signature.
    pub fn signable_bytes(&self) -> Vec<u8> {
        canonicalize(PayloadKind::Advertisement, &self.signable_fields())
    }

    /// Check the top-level signature and return the signer.
    ///
    /// Extended provider signatures are not checked here; see
    /// [`verify_advertisement`](crate::verify_advertisement).
    pub fn verify_signature(&self) -> Result<PeerId, AdError> {
        verify_fields(
            PayloadKind::Advertisement,
            &self.signable_fields(),
            &self.signature,
        )
    }

    /// Providers a retrieval client should contact, with inherited fields filled in.
    pub fn providers(&self) -> Vec<ResolvedProvider> {
        resolve(
            &self.provider,
            &self.addresses,
            &self.metadata,
            self.extended_providers.as_ref(),
        )
    }

    /// Encode to DAG-CBOR.
    pub fn encode(&self) -> Result<Vec<u8>, AdError> {
        encode_advertisement(self, Codec::DagCbor)
    }

    /// Decode from DAG-CBOR without verifying.
    pub fn decode(bytes: &[u8]) -> Result<Self, AdError> {
        decode_advertisement(bytes, Codec::DagCbor)
    }

    pub fn encode_as(&self, codec: Codec) -> Result<Vec<u8>, AdError> {
        encode_advertisement(self, codec)
    }

    pub fn decode_as(bytes: &[u8], codec: Codec) -> Result<Self, AdError> {
        decode_advertisement(bytes, codec)
    }

    /// Content identifier of the encoded record.
    pub fn link(&self) -> Result<Cid, AdError> {
        Ok(dag_cbor_link(&self.encode()?))
    }

    pub fn to_block(&self) -> Result<Block, AdError> {
        Ok(Block::from_bytes(self.encode()?))
    }
}

#[derive(Debug)]
enum BuilderState {
    Open(Box<Draft>),
    Signed,
}

#[derive(Debug)]
enum PendingProvider {
    Unsigned(ExtendedProviderInfo),
    Signed(ExtendedProvider),
}

#[derive(Debug)]
struct Draft {
    identity: Identity,
    addresses: Vec<Multiaddr>,
    previous: Option<Cid>,
    entries: Option<Cid>,
    context_id: Vec<u8>,
    metadata: Vec<u8>,
    is_remove: bool,
    is_override: bool,
    extended: Vec<PendingProvider>,
}

impl Draft {
    fn sign(&self) -> Result<Advertisement, AdError> {
        let (entries, metadata) = if self.is_remove {
            (no_entries(), Vec::new())
        } else {
            (
                self.entries.unwrap_or_else(no_entries),
                self.metadata.clone(),
            )
        };

        let extended_providers = if self.extended.is_empty() {
            None
        } else {
            let mut providers = Vec::with_capacity(self.extended.len());
            for pending in &self.extended {
                let entry = match pending {
                    PendingProvider::Unsigned(info) => info.sign(&self.context_id)?,
                    PendingProvider::Signed(entry) => {
                        entry.verify(&self.context_id)?;
                        entry.clone()
                    }
                };
                providers.push(entry);
            }
            Some(ExtendedProviders::new(providers, self.is_override))
        };

        let mut ad = Advertisement {
            previous: self.previous,
            provider: self.identity.peer_id(),
            addresses: self.addresses.clone(),
            entries,
            context_id: self.context_id.clone(),
            metadata,
            is_remove: self.is_remove,
            extended_providers,
            signature: Vec::new(),
        };
        validate(&ad)?;

        ad.signature = sign_fields(
            &self.identity,
            PayloadKind::Advertisement,
            &ad.signable_fields(),
        )?;
        Ok(ad)
    }
}

/// Builds and signs a single advertisement.
///
/// The builder is single-use: once [`build_and_sign`](Self::build_and_sign)
/// succeeds, every further call fails with [`AdError::BuilderFinalized`].
#[derive(Debug)]
pub struct AdBuilder {
    state: BuilderState,
}

impl AdBuilder {
    pub fn new(identity: Identity, addresses: Vec<Multiaddr>) -> Self {
        Self {
            state: BuilderState::Open(Box::new(Draft {
                identity,
                addresses,
                previous: None,
                entries: None,
                context_id: Vec::new(),
                metadata: Vec::new(),
                is_remove: false,
                is_override: false,
                extended: Vec::new(),
            })),
        }
    }

    fn draft(&mut self) -> Result<&mut Draft, AdError> {
        match &mut self.state {
            BuilderState::Open(draft) => Ok(draft.as_mut()),
            BuilderState::Signed => Err(AdError::BuilderFinalized),
        }
    }

    pub fn with_previous(&mut self, previous: Option<Cid>) -> Result<&mut Self, AdError> {
        self.draft()?.previous = previous;
        Ok(self)
    }

    pub fn with_entries(&mut self, entries: Cid) -> Result<&mut Self, AdError> {
        self.draft()?.entries = Some(entries);
        Ok(self)
    }

    pub fn with_context_id(&mut self, context_id: Vec<u8>) -> Result<&mut Self, AdError> {
        self.draft()?.context_id = context_id;
        Ok(self)
    }

    pub fn with_metadata(&mut self, metadata: Vec<u8>) -> Result<&mut Self, AdError> {
        self.draft()?.metadata = metadata;
        Ok(self)
    }

    /// Mark the record as a removal; entries and metadata are cleared on signing.
    pub fn with_removal(&mut self, is_remove: bool) -> Result<&mut Self, AdError> {
        self.draft()?.is_remove = is_remove;
        Ok(self)
    }

    /// Set the extended provider set's override flag.
    pub fn with_override(&mut self, is_override: bool) -> Result<&mut Self, AdError> {
        self.draft()?.is_override = is_override;
        Ok(self)
    }

    pub fn with_addresses(&mut self, addresses: Vec<Multiaddr>) -> Result<&mut Self, AdError> {
        self.draft()?.addresses = addresses;
        Ok(self)
    }

    /// Add an extended provider to be signed with its own key during `build_and_sign`.
    pub fn with_extended_provider(
        &mut self,
        info: ExtendedProviderInfo,
    ) -> Result<&mut Self, AdError> {
        self.draft()?.extended.push(PendingProvider::Unsigned(info));
        Ok(self)
    }

    /// Add an entry its operator already signed for this context ID.
    pub fn with_signed_extended_provider(
        &mut self,
        entry: ExtendedProvider,
    ) -> Result<&mut Self, AdError> {
        self.draft()?.extended.push(PendingProvider::Signed(entry));
        Ok(self)
    }

    pub fn is_signed(&self) -> bool {
        matches!(self.state, BuilderState::Signed)
    }

    /// Validate, sign, and finalize the record.
    ///
    /// On failure the builder stays open and can be corrected.
    pub fn build_and_sign(&mut self) -> Result<Advertisement, AdError> {
        let ad = match &self.state {
            BuilderState::Open(draft) => draft.sign()?,
            BuilderState::Signed => return Err(AdError::BuilderFinalized),
        };
        self.state = BuilderState::Signed;

        tracing::debug!(
            provider = %ad.provider,
            context_id = %hex::encode(&ad.context_id),
            is_remove = ad.is_remove,
            extended = ad.extended_providers.as_ref().map_or(0, |set| set.providers.len()),
            "signed advertisement"
        );
        Ok(ad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidationError;

    fn addr(s: &str) -> Multiaddr {
        s.parse().unwrap()
    }

    fn identity(seed: u8) -> Identity {
        Identity::from_ed25519_seed([seed; 32]).unwrap()
    }

    fn signed() -> Advertisement {
        let mut builder = AdBuilder::new(identity(1), vec![addr("/ip4/12.34.56.78/tcp/999/ws")]);
        builder
            .with_previous(Some(dag_cbor_link(b"prior")))
            .unwrap()
            .with_entries(dag_cbor_link(b"entries"))
            .unwrap()
            .with_context_id(b"ctx1".to_vec())
            .unwrap()
            .with_metadata(vec![0x90, 0x20])
            .unwrap();
        builder.build_and_sign().unwrap()
    }

    #[test]
    fn test_signed_record_verifies() {
        let ad = signed();
        assert_eq!(ad.verify_signature().unwrap(), identity(1).peer_id());
        assert_eq!(ad.provider(), &identity(1).peer_id());
        assert_eq!(ad.metadata(), &[0x90, 0x20]);
    }

    #[test]
    fn test_mutating_any_signed_field_breaks_signature() {
        let base = signed();
        let mutations: Vec<Box<dyn Fn(&mut Advertisement)>> = vec![
            Box::new(|ad: &mut Advertisement| ad.previous = None),
            Box::new(|ad: &mut Advertisement| ad.provider = identity(2).peer_id()),
            Box::new(|ad: &mut Advertisement| ad.addresses.push(addr("/ip4/1.2.3.4/tcp/1"))),
            Box::new(|ad: &mut Advertisement| ad.entries = dag_cbor_link(b"other entries")),
            Box::new(|ad: &mut Advertisement| ad.context_id = b"ctx2".to_vec()),
            Box::new(|ad: &mut Advertisement| ad.metadata[1] ^= 0x01),
            Box::new(|ad: &mut Advertisement| ad.is_remove = true),
        ];

        for mutate in mutations {
            let mut ad = base.clone();
            mutate(&mut ad);
            assert!(matches!(
                ad.verify_signature(),
                Err(AdError::SignatureInvalid)
            ));
        }
    }

    #[test]
    fn test_extended_providers_are_not_top_level_signed() {
        let mut ad = signed();
        ad.extended_providers = Some(ExtendedProviders::new(Vec::new(), true));
        assert!(ad.verify_signature().is_ok());
    }

    #[test]
    fn test_setters_fail_after_signing() {
        let mut builder = AdBuilder::new(identity(1), vec![addr("/ip4/1.2.3.4/tcp/1")]);
        builder.with_context_id(b"ctx".to_vec()).unwrap();
        builder.build_and_sign().unwrap();

        assert!(builder.is_signed());
        assert!(matches!(
            builder.with_metadata(vec![1]),
            Err(AdError::BuilderFinalized)
        ));
        assert!(matches!(
            builder.with_previous(None),
            Err(AdError::BuilderFinalized)
        ));
        assert!(matches!(
            builder.build_and_sign(),
            Err(AdError::BuilderFinalized)
        ));
    }

    #[test]
    fn test_failed_build_leaves_builder_open() {
        let mut builder = AdBuilder::new(identity(1), vec![addr("/ip4/1.2.3.4/tcp/1")]);
        assert!(matches!(
            builder.build_and_sign(),
            Err(AdError::Validation(ValidationError::EmptyContextId))
        ));
        assert!(!builder.is_signed());

        builder.with_context_id(b"ctx".to_vec()).unwrap();
        assert!(builder.build_and_sign().is_ok());
    }

    #[test]
    fn test_missing_addresses() {
        let mut builder = AdBuilder::new(identity(1), Vec::new());
        builder.with_context_id(b"ctx".to_vec()).unwrap();
        assert!(matches!(
            builder.build_and_sign(),
            Err(AdError::Validation(ValidationError::EmptyAddresses))
        ));
    }

    #[test]
    fn test_removal_clears_payload() {
        let mut builder = AdBuilder::new(identity(1), vec![addr("/ip4/1.2.3.4/tcp/1")]);
        builder
            .with_context_id(b"ctx".to_vec())
            .unwrap()
            .with_entries(dag_cbor_link(b"entries"))
            .unwrap()
            .with_metadata(vec![0x80, 0x12])
            .unwrap()
            .with_removal(true)
            .unwrap();
        let ad = builder.build_and_sign().unwrap();

        assert!(ad.is_remove());
        assert_eq!(ad.entries(), &no_entries());
        assert!(ad.metadata().is_empty());
        assert!(!ad.is_wildcard_removal());
    }

    #[test]
    fn test_wildcard_removal() {
        let mut builder = AdBuilder::new(identity(1), vec![addr("/ip4/1.2.3.4/tcp/1")]);
        builder.with_removal(true).unwrap();
        let ad = builder.build_and_sign().unwrap();

        assert!(ad.is_wildcard_removal());
        assert!(ad.verify_signature().is_ok());
    }

    #[test]
    fn test_default_entries_is_sentinel() {
        let mut builder = AdBuilder::new(identity(1), vec![addr("/ip4/1.2.3.4/tcp/1")]);
        builder.with_context_id(b"ctx".to_vec()).unwrap();
        assert_eq!(builder.build_and_sign().unwrap().entries(), &no_entries());
    }

    #[test]
    fn test_extended_providers_are_signed_by_their_own_keys() {
        let mut builder = AdBuilder::new(identity(1), vec![addr("/ip4/1.2.3.4/tcp/1")]);
        builder
            .with_context_id(b"ctx".to_vec())
            .unwrap()
            .with_extended_provider(ExtendedProviderInfo::new(
                identity(2),
                vec![addr("/ip4/5.6.7.8/tcp/2")],
                vec![0x80, 0x12],
            ))
            .unwrap();
        let ad = builder.build_and_sign().unwrap();

        let set = ad.extended_providers().unwrap();
        assert_eq!(set.providers().len(), 1);
        let entry = &set.providers()[0];
        assert_eq!(entry.provider(), &identity(2).peer_id());
        assert!(entry.verify(ad.context_id()).is_ok());
    }

    #[test]
    fn test_presigned_entry_for_other_context_is_rejected() {
        let entry = ExtendedProvider::sign(&identity(2), b"other", vec![], vec![], false).unwrap();
        let mut builder = AdBuilder::new(identity(1), vec![addr("/ip4/1.2.3.4/tcp/1")]);
        builder
            .with_context_id(b"ctx".to_vec())
            .unwrap()
            .with_signed_extended_provider(entry)
            .unwrap();

        assert!(matches!(
            builder.build_and_sign(),
            Err(AdError::ExtendedProviderSignatureInvalid { .. })
        ));
        assert!(!builder.is_signed());
    }

    #[test]
    fn test_round_trip() {
        let ad = signed();
        let bytes = ad.encode().unwrap();
        let decoded = Advertisement::decode(&bytes).unwrap();

        assert_eq!(decoded, ad);
        assert_eq!(decoded.link().unwrap(), ad.link().unwrap());
        assert_eq!(ad.to_block().unwrap().cid, ad.link().unwrap());
    }
}
