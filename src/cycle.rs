use anyhow::Context;

use crate::error::SyncError;
use crate::ingest;
use crate::models::SeasonData;
use crate::publish;
use crate::sheets::{SHEET_NAME_PREFIX, SheetSink};
use crate::store::RaidStore;
use crate::tacticus::TacticusClient;

/// One full run: read the roster, fetch the season's raid log, then merge,
/// publish and sweep. Exactly one cycle is ever in flight.
pub async fn run_cycle(
    store: &RaidStore,
    api: &TacticusClient,
    sink: &dyn SheetSink,
    season: Option<&str>,
) -> anyhow::Result<()> {
    let users = sink.player_ids().await.context("reading player roster")?;
    let data = api.fetch_season(season).await?;
    process_season(store, sink, &users, data).await
}

/// The post-fetch part of a cycle, separated from the API call so it can run
/// against canned data.
///
/// Ingestion errors abort the cycle before any publish; a pass that accepts
/// nothing publishes nothing and is not an error. Older seasons are swept
/// only once a strictly newer season has published.
pub async fn process_season(
    store: &RaidStore,
    sink: &dyn SheetSink,
    users: &[String],
    data: SeasonData,
) -> anyhow::Result<()> {
    let season: i64 = data
        .season
        .parse()
        .map_err(|_| SyncError::BadSeasonId(data.season.clone()))?;
    tracing::info!("processing raid data for season {season}");

    // Snapshot before ingest: ingesting makes this season the latest.
    let previous_latest = store.latest_season()?;
    let watermark = store.progress(season)?;

    let advanced = ingest::ingest(store, season, watermark, &data.entries)
        .with_context(|| format!("ingesting season {season}"))?;

    let Some(mark) = advanced else {
        tracing::info!("no new raid entries for season {season}, nothing to publish");
        return Ok(());
    };
    tracing::info!(
        "season {season} watermark now at tier {} level {}",
        mark.tier,
        mark.level
    );

    sink.ensure_sheet(&format!("{SHEET_NAME_PREFIX}{season}")).await?;
    publish::publish(store, sink, season, users).await?;

    if previous_latest.is_some_and(|prev| season > prev) {
        tracing::info!("season advanced past {}, sweeping older seasons", season - 1);
        store.sweep(season)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RaidEntry;
    use crate::sheets::ValueRange;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;

    struct RecordingSink {
        sheets: Mutex<Vec<String>>,
        batches: Mutex<Vec<Vec<ValueRange>>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                sheets: Mutex::new(Vec::new()),
                batches: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SheetSink for RecordingSink {
        async fn player_ids(&self) -> anyhow::Result<Vec<String>> {
            Ok(vec!["u1".to_string(), "u2".to_string()])
        }

        async fn ensure_sheet(&self, title: &str) -> anyhow::Result<()> {
            self.sheets.lock().unwrap().push(title.to_string());
            Ok(())
        }

        async fn batch_update(&self, data: Vec<ValueRange>) -> anyhow::Result<u64> {
            self.batches.lock().unwrap().push(data);
            Ok(0)
        }
    }

    fn season_data(season: &str, entries: Vec<RaidEntry>) -> SeasonData {
        SeasonData {
            season: season.to_string(),
            entries,
        }
    }

    fn entry(tier: i64, level: i64, dmg: i64, user: &str, ts: i64) -> RaidEntry {
        RaidEntry {
            tier,
            level,
            boss_key: "HiveTyrantGorgon".to_string(),
            damage_type: "Melee".to_string(),
            damage_dealt: dmg,
            user_id: user.to_string(),
            completed_on: ts,
        }
    }

    #[tokio::test]
    async fn full_cycle_for_a_fresh_season() {
        let store = RaidStore::open_in_memory().unwrap();
        let sink = RecordingSink::new();
        let users = vec!["u1".to_string(), "u2".to_string()];

        let data = season_data("40", vec![entry(3, 0, 100, "u1", 1000)]);
        process_season(&store, &sink, &users, data).await.unwrap();

        assert_eq!(
            store.progress(40).unwrap(),
            crate::models::Watermark { tier: 3, level: 0 }
        );
        assert_eq!(*sink.sheets.lock().unwrap(), ["Season 40"]);

        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch[0].range, "Season 40!Q2");
        assert_eq!(
            batch[0].values,
            vec![vec![Value::from("Hive Tyrant (Hive fleet Gorgon)")]]
        );
        assert_eq!(batch[1].values, vec![vec![Value::from(100), Value::from("")]]);
        assert_eq!(batch[2].values, vec![vec![Value::from(1), Value::from("")]]);
    }

    #[tokio::test]
    async fn empty_ingest_publishes_nothing_and_succeeds() {
        let store = RaidStore::open_in_memory().unwrap();
        let sink = RecordingSink::new();
        let users = vec!["u1".to_string()];

        let data = season_data("40", vec![]);
        process_season(&store, &sink, &users, data).await.unwrap();

        assert!(sink.sheets.lock().unwrap().is_empty());
        assert!(sink.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn season_advance_sweeps_the_old_season() {
        let store = RaidStore::open_in_memory().unwrap();
        let sink = RecordingSink::new();
        let users = vec!["u1".to_string()];

        let old = season_data("30", vec![entry(3, 0, 50, "u1", 10)]);
        process_season(&store, &sink, &users, old).await.unwrap();
        assert_eq!(store.latest_season().unwrap(), Some(30));

        let new = season_data("31", vec![entry(3, 0, 60, "u1", 20)]);
        process_season(&store, &sink, &users, new).await.unwrap();

        assert_eq!(store.latest_season().unwrap(), Some(31));
        assert_eq!(store.slot_boss(30, 3, 0).unwrap(), None);
        assert!(store.slot_totals(30, 3, 0).unwrap().is_empty());
        assert!(store.slot_boss(31, 3, 0).unwrap().is_some());
    }

    #[tokio::test]
    async fn revisiting_the_current_season_does_not_sweep_it() {
        let store = RaidStore::open_in_memory().unwrap();
        let sink = RecordingSink::new();
        let users = vec!["u1".to_string()];

        let first = season_data("40", vec![entry(3, 0, 50, "u1", 10)]);
        process_season(&store, &sink, &users, first).await.unwrap();
        let again = season_data("40", vec![entry(3, 1, 60, "u1", 20)]);
        process_season(&store, &sink, &users, again).await.unwrap();

        assert!(store.slot_boss(40, 3, 0).unwrap().is_some());
        assert_eq!(
            store.progress(40).unwrap(),
            crate::models::Watermark { tier: 3, level: 1 }
        );
    }

    #[tokio::test]
    async fn non_numeric_season_fails_the_cycle() {
        let store = RaidStore::open_in_memory().unwrap();
        let sink = RecordingSink::new();
        let err = process_season(&store, &sink, &[], season_data("latest", vec![]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("latest"));
    }
}
