use serde::Deserialize;

/// Raid data for one season as returned by the Tacticus API.
///
/// The season id is a string on the wire but numeric in practice; it is
/// parsed at the cycle boundary. Deserialization is all-or-nothing: an entry
/// missing a required field fails the whole fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct SeasonData {
    pub season: String,
    pub entries: Vec<RaidEntry>,
}

/// One raid-log entry: a single attack against a boss encounter.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaidEntry {
    pub tier: i64,
    /// The API calls the encounter index within a tier a "set".
    #[serde(rename = "set")]
    pub level: i64,
    /// Opaque boss key, resolved to a display name via the catalog.
    #[serde(rename = "type")]
    pub boss_key: String,
    pub damage_type: String,
    pub damage_dealt: i64,
    pub user_id: String,
    /// Unix timestamp; unique per entry, used as the dedup key.
    pub completed_on: i64,
}

/// Highest (tier, level) pair confirmed fully ingested for a season.
/// Ordering is tier-major, which is exactly the feed's progression order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Watermark {
    pub tier: i64,
    pub level: i64,
}

/// Aggregated damage for one player in one (tier, level) slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerTotal {
    pub user_id: String,
    pub damage: i64,
    pub battles: i64,
}
