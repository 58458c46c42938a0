use serde_json::Value;

use crate::catalog;
use crate::error::SyncError;
use crate::sheets::{SHEET_NAME_PREFIX, SheetSink, ValueRange};
use crate::store::RaidStore;

/// Push per-player totals for every discovered slot of `season` into the
/// sink, one batched write per slot (boss name + damage vector + battle
/// vector). Slots whose boss has not been discovered yet are skipped.
///
/// Fail-fast: the first slot that errors aborts the remaining slots, since
/// slot order encodes the tier/level progression.
pub async fn publish(
    store: &RaidStore,
    sink: &dyn SheetSink,
    season: i64,
    users: &[String],
) -> anyhow::Result<()> {
    let sheet_name = format!("{SHEET_NAME_PREFIX}{season}");

    for tier in catalog::TRACKED_TIERS {
        let levels = catalog::levels_in_tier(tier)?;
        for level in 0..levels {
            let Some(boss_key) = store.slot_boss(season, tier, level)? else {
                // Encounter not reached yet.
                continue;
            };
            let boss_name = catalog::boss_display_name(&boss_key)?;
            let ranges = catalog::slot_range(tier, level)?;

            // Players without events stay blank, not zero.
            let blank = Value::String(String::new());
            let mut damage = vec![blank.clone(); users.len()];
            let mut battles = vec![blank; users.len()];
            for total in store.slot_totals(season, tier, level)? {
                let idx = users
                    .iter()
                    .position(|u| *u == total.user_id)
                    .ok_or_else(|| SyncError::UnknownPlayer(total.user_id.clone()))?;
                damage[idx] = Value::from(total.damage);
                battles[idx] = Value::from(total.battles);
            }

            tracing::info!("{} {}: {boss_name}", catalog::tier_name(tier), level + 1);

            sink.batch_update(vec![
                ValueRange {
                    range: format!("{sheet_name}!{}", ranges.boss_name),
                    major_dimension: "ROWS",
                    values: vec![vec![Value::from(boss_name)]],
                },
                ValueRange {
                    range: format!("{sheet_name}!{}", ranges.dmg),
                    major_dimension: "COLUMNS",
                    values: vec![damage],
                },
                ValueRange {
                    range: format!("{sheet_name}!{}", ranges.battles),
                    major_dimension: "COLUMNS",
                    values: vec![battles],
                },
            ])
            .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RaidEntry;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingSink {
        batches: Mutex<Vec<Vec<ValueRange>>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                batches: Mutex::new(Vec::new()),
            }
        }

        fn batches(&self) -> Vec<Vec<ValueRange>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SheetSink for RecordingSink {
        async fn player_ids(&self) -> anyhow::Result<Vec<String>> {
            Ok(vec!["u1".to_string(), "u2".to_string()])
        }

        async fn ensure_sheet(&self, _title: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn batch_update(&self, data: Vec<ValueRange>) -> anyhow::Result<u64> {
            self.batches.lock().unwrap().push(data);
            Ok(0)
        }
    }

    fn entry(tier: i64, level: i64, boss: &str, dmg: i64, user: &str, ts: i64) -> RaidEntry {
        RaidEntry {
            tier,
            level,
            boss_key: boss.to_string(),
            damage_type: "Melee".to_string(),
            damage_dealt: dmg,
            user_id: user.to_string(),
            completed_on: ts,
        }
    }

    fn users() -> Vec<String> {
        vec!["u1".to_string(), "u2".to_string()]
    }

    #[tokio::test]
    async fn aggregates_and_leaves_blanks() {
        let store = RaidStore::open_in_memory().unwrap();
        store.ensure_season(40).unwrap();
        store.record_boss(40, 3, 0, "SilentKing").unwrap();
        store.record_damage(40, &entry(3, 0, "SilentKing", 10, "u1", 1)).unwrap();
        store.record_damage(40, &entry(3, 0, "SilentKing", 5, "u1", 2)).unwrap();

        let sink = RecordingSink::new();
        publish(&store, &sink, 40, &users()).await.unwrap();

        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.len(), 3);

        assert_eq!(batch[0].range, "Season 40!Q2");
        assert_eq!(batch[0].major_dimension, "ROWS");
        assert_eq!(batch[0].values, vec![vec![Value::from("Szarekh")]]);

        assert_eq!(batch[1].range, "Season 40!Q4:Q33");
        assert_eq!(batch[1].major_dimension, "COLUMNS");
        assert_eq!(batch[1].values, vec![vec![Value::from(15), Value::from("")]]);

        assert_eq!(batch[2].range, "Season 40!R4:R33");
        assert_eq!(batch[2].values, vec![vec![Value::from(2), Value::from("")]]);
    }

    #[tokio::test]
    async fn undiscovered_slots_produce_no_writes() {
        let store = RaidStore::open_in_memory().unwrap();
        store.ensure_season(40).unwrap();

        let sink = RecordingSink::new();
        publish(&store, &sink, 40, &users()).await.unwrap();
        assert!(sink.batches().is_empty());
    }

    #[tokio::test]
    async fn one_batch_per_discovered_slot() {
        let store = RaidStore::open_in_memory().unwrap();
        store.ensure_season(40).unwrap();
        store.record_boss(40, 3, 0, "SilentKing").unwrap();
        store.record_damage(40, &entry(3, 0, "SilentKing", 10, "u1", 1)).unwrap();
        store.record_boss(40, 4, 1, "Mortarion").unwrap();
        store.record_damage(40, &entry(4, 1, "Mortarion", 20, "u2", 2)).unwrap();

        let sink = RecordingSink::new();
        publish(&store, &sink, 40, &users()).await.unwrap();

        let batches = sink.batches();
        assert_eq!(batches.len(), 2);
        // Tier-ascending, level-ascending order.
        assert_eq!(batches[0][0].range, "Season 40!Q2");
        assert_eq!(batches[1][0].range, "Season 40!AI2");
    }

    #[tokio::test]
    async fn unknown_boss_key_aborts_the_publish() {
        let store = RaidStore::open_in_memory().unwrap();
        store.ensure_season(40).unwrap();
        store.record_boss(40, 3, 0, "Abaddon").unwrap();
        store.record_damage(40, &entry(3, 0, "Abaddon", 10, "u1", 1)).unwrap();

        let sink = RecordingSink::new();
        let err = publish(&store, &sink, 40, &users()).await.unwrap_err();
        assert!(err.to_string().contains("Abaddon"));
        assert!(sink.batches().is_empty());
    }

    #[tokio::test]
    async fn player_off_the_roster_aborts_the_publish() {
        let store = RaidStore::open_in_memory().unwrap();
        store.ensure_season(40).unwrap();
        store.record_boss(40, 3, 0, "SilentKing").unwrap();
        store.record_damage(40, &entry(3, 0, "SilentKing", 10, "stranger", 1)).unwrap();

        let sink = RecordingSink::new();
        let err = publish(&store, &sink, 40, &users()).await.unwrap_err();
        assert!(err.to_string().contains("stranger"));
    }
}
