use crate::catalog;
use crate::models::{RaidEntry, Watermark};
use crate::store::RaidStore;

/// Bomb attacks are scripted, not player damage, and are never stored.
const EXCLUDED_DAMAGE_KIND: &str = "Bomb";

/// Merge raw API entries for one season into the store.
///
/// Entries are filtered against the tracked-tier set and the season's
/// watermark, then inserted with insert-or-ignore semantics so replaying the
/// same feed changes nothing. Returns the new watermark (the tier/level of
/// the last accepted entry, in input order) when at least one entry was
/// accepted, `None` otherwise — in which case the stored watermark is left
/// untouched.
pub fn ingest(
    store: &RaidStore,
    season: i64,
    watermark: Watermark,
    entries: &[RaidEntry],
) -> anyhow::Result<Option<Watermark>> {
    store.ensure_season(season)?;

    let mut last_accepted: Option<Watermark> = None;
    for entry in entries {
        if !catalog::TRACKED_TIERS.contains(&entry.tier) || entry.tier < watermark.tier {
            continue;
        }
        // The level filter is scoped to the watermark's tier. Entries for a
        // higher tier are taken as-is: the feed is append-only and monotonic
        // per season, so a higher tier implies the previous one completed.
        if entry.tier == watermark.tier && entry.level < watermark.level {
            continue;
        }
        if entry.damage_type == EXCLUDED_DAMAGE_KIND {
            continue;
        }

        store.record_boss(season, entry.tier, entry.level, &entry.boss_key)?;
        store.record_damage(season, entry)?;
        last_accepted = Some(Watermark {
            tier: entry.tier,
            level: entry.level,
        });
    }

    if let Some(mark) = last_accepted {
        store.advance(season, mark)?;
    }
    Ok(last_accepted)
}
