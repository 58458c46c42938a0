use rusqlite::{Connection, params};
use std::sync::Mutex;

use crate::models::{PlayerTotal, RaidEntry, Watermark};

/// The per-run working set: raw damage events, discovered bosses and the
/// per-season ingestion watermark, all in one SQLite database.
///
/// Dedup lives in the schema: `damages.completedon` is UNIQUE and both event
/// and boss inserts use INSERT OR IGNORE, so replaying a feed is a no-op.
pub struct RaidStore {
    conn: Mutex<Connection>,
}

impl RaidStore {
    /// Only the current season's working set is retained, so the store is
    /// in-memory; it is rebuilt from the API on restart.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS progress (
                season INTEGER PRIMARY KEY,
                tier   INTEGER NOT NULL,
                level  INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS bosses (
                season INTEGER NOT NULL,
                tier   INTEGER NOT NULL,
                level  INTEGER NOT NULL,
                name   TEXT NOT NULL,
                UNIQUE(season, tier, level)
            );

            CREATE TABLE IF NOT EXISTS damages (
                tier        INTEGER NOT NULL,
                level       INTEGER NOT NULL,
                dmg         INTEGER NOT NULL,
                userid      TEXT NOT NULL,
                completedon INTEGER NOT NULL UNIQUE,
                season      INTEGER NOT NULL REFERENCES progress(season)
            );
            ",
        )?;
        Ok(())
    }

    // ── Progress tracker ──

    /// Create the season's progress row at (0, 0) if it does not exist, so
    /// the foreign key from `damages` always resolves.
    pub fn ensure_season(&self, season: i64) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO progress (season, tier, level) VALUES (?1, 0, 0)",
            params![season],
        )?;
        Ok(())
    }

    /// The season's watermark, or (0, 0) when the season is unseen.
    pub fn progress(&self, season: i64) -> anyhow::Result<Watermark> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT tier, level FROM progress WHERE season = ?1")?;
        let mut rows = stmt.query_map(params![season], |row| {
            Ok(Watermark {
                tier: row.get(0)?,
                level: row.get(1)?,
            })
        })?;
        Ok(rows.next().transpose()?.unwrap_or_default())
    }

    pub fn latest_season(&self) -> anyhow::Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT season FROM progress ORDER BY season DESC LIMIT 1")?;
        let mut rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        Ok(rows.next().transpose()?)
    }

    /// Replace the season's watermark unconditionally. Callers only invoke
    /// this after a merge that actually accepted entries.
    pub fn advance(&self, season: i64, mark: Watermark) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO progress (season, tier, level) VALUES (?1, ?2, ?3)",
            params![season, mark.tier, mark.level],
        )?;
        Ok(())
    }

    // ── Raw event store ──

    /// First writer wins: a slot's boss is fixed the first time any event
    /// for it is seen.
    pub fn record_boss(
        &self,
        season: i64,
        tier: i64,
        level: i64,
        boss_key: &str,
    ) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO bosses (season, tier, level, name) VALUES (?1, ?2, ?3, ?4)",
            params![season, tier, level, boss_key],
        )?;
        Ok(())
    }

    pub fn record_damage(&self, season: i64, entry: &RaidEntry) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO damages (tier, level, dmg, userid, completedon, season) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.tier,
                entry.level,
                entry.damage_dealt,
                entry.user_id,
                entry.completed_on,
                season
            ],
        )?;
        Ok(())
    }

    /// The boss key discovered for a slot, or `None` if the encounter has
    /// not been reached yet.
    pub fn slot_boss(&self, season: i64, tier: i64, level: i64) -> anyhow::Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT name FROM bosses WHERE season = ?1 AND tier = ?2 AND level = ?3")?;
        let mut rows = stmt.query_map(params![season, tier, level], |row| row.get::<_, String>(0))?;
        Ok(rows.next().transpose()?)
    }

    /// Per-player damage sum and battle count for one slot.
    pub fn slot_totals(
        &self,
        season: i64,
        tier: i64,
        level: i64,
    ) -> anyhow::Result<Vec<PlayerTotal>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT userid, SUM(dmg), COUNT(*) FROM damages \
             WHERE season = ?1 AND tier = ?2 AND level = ?3 GROUP BY userid",
        )?;
        let rows = stmt
            .query_map(params![season, tier, level], |row| {
                Ok(PlayerTotal {
                    user_id: row.get(0)?,
                    damage: row.get(1)?,
                    battles: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Retention sweeper ──

    /// Drop everything belonging to seasons older than `current_season`.
    /// Idempotent; never touches the current season's rows.
    pub fn sweep(&self, current_season: i64) -> anyhow::Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM damages WHERE season < ?1", params![current_season])?;
        tx.execute("DELETE FROM bosses WHERE season < ?1", params![current_season])?;
        tx.execute("DELETE FROM progress WHERE season < ?1", params![current_season])?;
        tx.commit()?;
        Ok(())
    }
}
