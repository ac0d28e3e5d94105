//! Verification of encoded advertisements.

use crate::advertisement::Advertisement;
use crate::error::AdError;
use crate::schema::Codec;
use crate::validate::{validate_with_limits, ValidationLimits};
use cid::Cid;
use libp2p_identity::PeerId;

/// An advertisement whose structure and every signature have been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAdvertisement {
    /// Peer ID recovered from the top-level signature; equals the record's provider.
    pub signer: PeerId,
    /// Link of the verified bytes.
    pub link: Cid,
    pub advertisement: Advertisement,
}

/// Decode and verify an advertisement with the default limits.
pub fn verify(bytes: &[u8]) -> Result<VerifiedAdvertisement, AdError> {
    verify_with_limits(bytes, &ValidationLimits::default())
}

pub fn verify_with_limits(
    bytes: &[u8],
    limits: &ValidationLimits,
) -> Result<VerifiedAdvertisement, AdError> {
    verify_encoded(bytes, Codec::DagCbor, limits)
}

/// Decode `bytes` with `codec` and verify. The link is taken over the bytes as given.
pub fn verify_encoded(
    bytes: &[u8],
    codec: Codec,
    limits: &ValidationLimits,
) -> Result<VerifiedAdvertisement, AdError> {
    let advertisement = Advertisement::decode_as(bytes, codec)?;
    let signer = verify_advertisement(&advertisement, limits)?;
    Ok(VerifiedAdvertisement {
        signer,
        link: codec.link(bytes),
        advertisement,
    })
}

/// Verify an already decoded advertisement, returning its signer.
///
/// Checks run in order and the first failure aborts: structure, the top-level
/// signature, then each extended provider's own signature.
pub fn verify_advertisement(
    ad: &Advertisement,
    limits: &ValidationLimits,
) -> Result<PeerId, AdError> {
    validate_with_limits(ad, limits)?;

    let signer = ad.verify_signature()?;
    tracing::debug!(%signer, "verified advertisement signature");

    if let Some(set) = ad.extended_providers() {
        for entry in set.providers() {
            entry.verify(ad.context_id())?;
            tracing::debug!(provider = %entry.provider(), "verified extended provider");
        }
    }

    Ok(signer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advertisement::AdBuilder;
    use crate::extended::ExtendedProviderInfo;
    use crate::identity::Identity;
    use crate::validate::ValidationError;
    use multiaddr::Multiaddr;

    fn addr(s: &str) -> Multiaddr {
        s.parse().unwrap()
    }

    fn builder(seed: u8) -> AdBuilder {
        let identity = Identity::from_ed25519_seed([seed; 32]).unwrap();
        let mut builder = AdBuilder::new(identity, vec![addr("/ip4/12.34.56.78/tcp/999/ws")]);
        builder.with_context_id(b"ctx1".to_vec()).unwrap();
        builder
    }

    #[test]
    fn test_verify_returns_signer_and_link() {
        let ad = builder(1).build_and_sign().unwrap();
        let bytes = ad.encode().unwrap();

        let verified = verify(&bytes).unwrap();
        assert_eq!(verified.signer, *ad.provider());
        assert_eq!(verified.link, ad.link().unwrap());
        assert_eq!(verified.advertisement, ad);
    }

    #[test]
    fn test_verify_dag_json_encoding() {
        let mut b = builder(1);
        b.with_metadata(vec![0x80, 0x12])
            .unwrap()
            .with_extended_provider(ExtendedProviderInfo::new(
                Identity::from_ed25519_seed([2u8; 32]).unwrap(),
                vec![addr("/ip4/5.6.7.8/tcp/2")],
                Vec::new(),
            ))
            .unwrap();
        let ad = b.build_and_sign().unwrap();
        let json = ad.encode_as(Codec::DagJson).unwrap();
        assert!(json.starts_with(b"{"));

        let verified =
            verify_encoded(&json, Codec::DagJson, &ValidationLimits::default()).unwrap();
        assert_eq!(verified.advertisement, ad);
        assert_eq!(verified.link, Codec::DagJson.link(&json));
        assert_ne!(verified.link, ad.link().unwrap());
    }

    #[test]
    fn test_verify_rejects_undecodable_bytes() {
        assert!(matches!(verify(&[0x01, 0x02]), Err(AdError::Decode(_))));
    }

    #[test]
    fn test_verify_propagates_validation_errors() {
        let ad = builder(1).build_and_sign().unwrap();
        let mut tampered = ad.clone();
        tampered.addresses.clear();

        assert!(matches!(
            verify_advertisement(&tampered, &ValidationLimits::default()),
            Err(AdError::Validation(ValidationError::EmptyAddresses))
        ));
    }

    #[test]
    fn test_limits_apply_on_verify() {
        let ad = builder(1).build_and_sign().unwrap();
        let limits = ValidationLimits {
            max_context_id_len: 2,
            ..ValidationLimits::default()
        };

        assert!(matches!(
            verify_with_limits(&ad.encode().unwrap(), &limits),
            Err(AdError::Validation(ValidationError::OversizedContextId { .. }))
        ));
    }

    #[test]
    fn test_tampered_extended_provider_is_caught() {
        let mut b = builder(1);
        b.with_extended_provider(ExtendedProviderInfo::new(
            Identity::from_ed25519_seed([2u8; 32]).unwrap(),
            vec![addr("/ip4/5.6.7.8/tcp/2")],
            Vec::new(),
        ))
        .unwrap();
        let mut ad = b.build_and_sign().unwrap();
        assert!(verify_advertisement(&ad, &ValidationLimits::default()).is_ok());

        if let Some(set) = ad.extended_providers.as_mut() {
            set.providers[0].addresses = vec![addr("/ip4/6.6.6.6/tcp/6")];
        }
        // The top-level signature still holds; only the entry's own check fails.
        assert!(ad.verify_signature().is_ok());
        assert!(matches!(
            verify_advertisement(&ad, &ValidationLimits::default()),
            Err(AdError::ExtendedProviderSignatureInvalid { .. })
        ));
    }
}
