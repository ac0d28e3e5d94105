//! Ordered provider address lists.
//!
//! Retrieval clients dial addresses in listed order, so parsing keeps the
//! caller's order and never sorts or deduplicates.

use crate::error::AdError;
use multiaddr::Multiaddr;

/// Parse a single multiaddr string.
pub fn parse(input: &str) -> Result<Multiaddr, AdError> {
    input
        .parse::<Multiaddr>()
        .map_err(|e| AdError::MalformedAddress {
            input: input.to_string(),
            reason: e.to_string(),
        })
}

/// Parse every address, failing on the first malformed one.
pub fn parse_all<I, S>(inputs: I) -> Result<Vec<Multiaddr>, AdError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    inputs.into_iter().map(|s| parse(s.as_ref())).collect()
}

/// Render addresses in their string form, as carried on the wire.
pub fn to_strings(addresses: &[Multiaddr]) -> Vec<String> {
    addresses.iter().map(ToString::to_string).collect()
}
