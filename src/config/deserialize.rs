// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles the non-empty tunnel list.

use nonempty::NonEmpty;
use serde::Deserialize;

use super::TunnelEntry;

pub fn deserialize_tunnels<'de, D>(deserializer: D) -> Result<NonEmpty<TunnelEntry>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries: Vec<TunnelEntry> = Vec::deserialize(deserializer)?;
    NonEmpty::from_vec(entries)
        .ok_or_else(|| serde::de::Error::custom("at least one tunnel is required"))
}
