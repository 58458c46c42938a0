use thiserror::Error;

/// Domain errors that fail a sync cycle.
///
/// All of these indicate either stale static tables (boss dictionary,
/// slot coordinates, player roster) or bad data from the API, and must be
/// surfaced rather than papered over with a default.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("boss key '{0}' is not in the boss dictionary")]
    UnknownBoss(String),

    #[error("player '{0}' has raid damage but is not on the roster")]
    UnknownPlayer(String),

    #[error("no sheet coordinates configured for tier {tier} level {level}")]
    UnknownSlot { tier: i64, level: i64 },

    #[error("tier {0} is not in the tier size table")]
    UnknownTier(i64),

    #[error("player roster has a blank entry at sheet row {0}")]
    BlankRosterRow(usize),

    #[error("template sheet '{0}' not found in spreadsheet")]
    MissingTemplateSheet(String),

    #[error("season id '{0}' is not numeric")]
    BadSeasonId(String),
}
