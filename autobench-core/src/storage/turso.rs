//! Turso/libSQL implementation of the result store.
//!
//! Uses a local embedded database file, or an in-memory database for tests.
//! A single connection behind an async mutex serializes every operation.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Builder, Connection, Database};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::{BenchmarkStore, Error, Result};
use crate::commands::{CreateRun, FinishRun};
use crate::config::Configuration;
use crate::inference::PerformanceMetrics;
use crate::result::{BenchmarkResult, RunRecord, RunStatus};
use crate::sweep::SweepMode;
use crate::types::{RunId, TestCaseId};

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: i64 = 2;

const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
)
"#;

/// SQL schema for the runs table (version 1).
const SCHEMA_RUNS: &str = r#"
CREATE TABLE IF NOT EXISTS benchmark_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    model_path TEXT NOT NULL,
    model_name TEXT NOT NULL,
    sweep_mode TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    total_configs INTEGER NOT NULL DEFAULT 0,
    total_tests INTEGER NOT NULL DEFAULT 0,
    best_score REAL,
    best_config TEXT
)
"#;

/// SQL schema for the results table (version 1).
const SCHEMA_RESULTS: &str = r#"
CREATE TABLE IF NOT EXISTS benchmark_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL,
    test_case_id TEXT NOT NULL,
    test_case_name TEXT NOT NULL,
    temperature REAL NOT NULL,
    top_p REAL NOT NULL,
    top_k INTEGER NOT NULL,
    min_p REAL NOT NULL,
    repeat_penalty REAL NOT NULL,
    frequency_penalty REAL NOT NULL,
    presence_penalty REAL NOT NULL,
    max_tokens INTEGER NOT NULL,
    seed INTEGER NOT NULL,
    response TEXT NOT NULL,
    match_percentage REAL NOT NULL,
    is_pass INTEGER NOT NULL,
    tokens_per_second REAL NOT NULL,
    time_to_first_token REAL NOT NULL,
    total_latency REAL NOT NULL,
    token_count INTEGER NOT NULL,
    timestamp TEXT NOT NULL,
    FOREIGN KEY (run_id) REFERENCES benchmark_runs(id)
)
"#;

const INDEX_RESULTS_RUN: &str = r#"
CREATE INDEX IF NOT EXISTS idx_benchmark_results_run_id
ON benchmark_results(run_id)
"#;

const INDEX_RESULTS_SCORE: &str = r#"
CREATE INDEX IF NOT EXISTS idx_benchmark_results_score
ON benchmark_results(match_percentage DESC)
"#;

/// Forward migrations, keyed by the version they produce.
const MIGRATIONS: &[(i64, &[&str])] = &[(
    2,
    &["ALTER TABLE benchmark_runs ADD COLUMN status TEXT NOT NULL DEFAULT 'completed'"],
)];

const RUN_COLUMNS: &str = "id, model_path, model_name, sweep_mode, status, started_at, finished_at, total_configs, total_tests, best_score, best_config";

const RESULT_COLUMNS: &str = "run_id, test_case_id, test_case_name, temperature, top_p, top_k, min_p, repeat_penalty, frequency_penalty, presence_penalty, max_tokens, seed, response, match_percentage, is_pass, tokens_per_second, time_to_first_token, total_latency, token_count, timestamp";

/// Turso-backed benchmark store.
pub struct TursoBenchmarkStore {
    // Keeps the database alive for the lifetime of the connection.
    _db: Database,
    conn: Mutex<Connection>,
}

impl TursoBenchmarkStore {
    /// Open (or create) a local embedded database.
    pub async fn new_local(path: &Path) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        Self::open(db).await
    }

    /// Create a new in-memory store (for testing).
    pub async fn new_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::open(db).await
    }

    async fn open(db: Database) -> Result<Self> {
        let conn = db.connect()?;
        migrate(&conn).await?;
        Ok(Self {
            _db: db,
            conn: Mutex::new(conn),
        })
    }

    /// Schema version recorded in the database.
    pub async fn schema_version(&self) -> Result<Option<i64>> {
        let conn = self.conn.lock().await;
        read_schema_version(&conn).await
    }

    /// Parse a run from a database row.
    fn parse_run(row: &libsql::Row) -> Result<RunRecord> {
        let id: i64 = row.get(0)?;
        let model_path: String = row.get(1)?;
        let model_name: String = row.get(2)?;
        let sweep_mode_str: String = row.get(3)?;
        let status_str: String = row.get(4)?;
        let started_at_str: String = row.get(5)?;
        let finished_at_str: Option<String> = row.get(6)?;
        let total_configs: i64 = row.get(7)?;
        let total_tests: i64 = row.get(8)?;
        let best_score: Option<f64> = row.get(9)?;
        let best_config_json: Option<String> = row.get(10)?;

        let sweep_mode = SweepMode::parse(&sweep_mode_str)
            .ok_or_else(|| Error::InvalidData(format!("invalid sweep mode: {}", sweep_mode_str)))?;
        let status = RunStatus::parse(&status_str)
            .ok_or_else(|| Error::InvalidData(format!("invalid status: {}", status_str)))?;
        let started_at = parse_datetime(&started_at_str)?;
        let finished_at = finished_at_str
            .as_ref()
            .map(|s| parse_datetime(s))
            .transpose()?;
        let best_config = best_config_json
            .as_ref()
            .map(|json| serde_json::from_str::<Configuration>(json))
            .transpose()?;

        Ok(RunRecord {
            id: RunId(id),
            model_path,
            model_name,
            sweep_mode,
            status,
            started_at,
            finished_at,
            total_configs: to_u32(total_configs, "total_configs")?,
            total_tests: to_u32(total_tests, "total_tests")?,
            best_score,
            best_config,
        })
    }

    /// Parse a result from a database row.
    fn parse_result(row: &libsql::Row) -> Result<BenchmarkResult> {
        let run_id: i64 = row.get(0)?;
        let test_case_id_str: String = row.get(1)?;
        let test_case_name: String = row.get(2)?;
        let temperature: f64 = row.get(3)?;
        let top_p: f64 = row.get(4)?;
        let top_k: i64 = row.get(5)?;
        let min_p: f64 = row.get(6)?;
        let repeat_penalty: f64 = row.get(7)?;
        let frequency_penalty: f64 = row.get(8)?;
        let presence_penalty: f64 = row.get(9)?;
        let max_tokens: i64 = row.get(10)?;
        let seed: i64 = row.get(11)?;
        let response: String = row.get(12)?;
        let match_percentage: f64 = row.get(13)?;
        let is_pass: i64 = row.get(14)?;
        let tokens_per_second: f64 = row.get(15)?;
        let time_to_first_token: f64 = row.get(16)?;
        let total_latency: f64 = row.get(17)?;
        let token_count: i64 = row.get(18)?;
        let timestamp_str: String = row.get(19)?;

        let test_case_id = TestCaseId(test_case_id_str.parse().map_err(|_| {
            Error::InvalidData(format!("invalid test case id: {}", test_case_id_str))
        })?);
        let top_k = i32::try_from(top_k)
            .map_err(|_| Error::InvalidData(format!("invalid top_k: {}", top_k)))?;

        Ok(BenchmarkResult {
            run_id: RunId(run_id),
            test_case_id,
            test_case_name,
            config: Configuration {
                temperature: temperature as f32,
                top_p: top_p as f32,
                top_k,
                min_p: min_p as f32,
                repeat_penalty: repeat_penalty as f32,
                frequency_penalty: frequency_penalty as f32,
                presence_penalty: presence_penalty as f32,
                max_tokens: to_u32(max_tokens, "max_tokens")?,
                seed: to_u32(seed, "seed")?,
            },
            response,
            match_percentage,
            is_pass: is_pass != 0,
            metrics: PerformanceMetrics {
                tokens_per_second,
                time_to_first_token_ms: time_to_first_token,
                total_latency_ms: total_latency,
                token_count: to_u32(token_count, "token_count")?,
            },
            timestamp: parse_datetime(&timestamp_str)?,
        })
    }
}

#[async_trait]
impl BenchmarkStore for TursoBenchmarkStore {
    #[instrument(skip(self), level = "debug")]
    async fn create_run(&self, cmd: CreateRun) -> Result<RunId> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO benchmark_runs (model_path, model_name, sweep_mode, status, started_at, total_configs, total_tests) VALUES (?, ?, ?, ?, ?, ?, ?)",
            libsql::params![
                cmd.model_path,
                cmd.model_name,
                cmd.sweep_mode.as_str(),
                RunStatus::Running.as_str(),
                format_datetime(Utc::now()),
                i64::from(cmd.total_configs),
                i64::from(cmd.total_tests)
            ],
        )
        .await?;
        let id = RunId(conn.last_insert_rowid());
        debug!(%id, "created run");
        Ok(id)
    }

    #[instrument(skip(self, result), level = "debug", fields(run_id = %result.run_id))]
    async fn save_result(&self, result: &BenchmarkResult) -> Result<()> {
        let conn = self.conn.lock().await;
        let config = &result.config;
        let sql = format!(
            "INSERT INTO benchmark_results ({RESULT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        conn.execute(
            &sql,
            libsql::params![
                result.run_id.0,
                result.test_case_id.to_string(),
                result.test_case_name.clone(),
                f64::from(config.temperature),
                f64::from(config.top_p),
                i64::from(config.top_k),
                f64::from(config.min_p),
                f64::from(config.repeat_penalty),
                f64::from(config.frequency_penalty),
                f64::from(config.presence_penalty),
                i64::from(config.max_tokens),
                i64::from(config.seed),
                result.response.clone(),
                result.match_percentage,
                i64::from(result.is_pass),
                result.metrics.tokens_per_second,
                result.metrics.time_to_first_token_ms,
                result.metrics.total_latency_ms,
                i64::from(result.metrics.token_count),
                format_datetime(result.timestamp)
            ],
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug", fields(run_id = %cmd.run_id))]
    async fn finish_run(&self, cmd: FinishRun) -> Result<()> {
        let best_config_json = cmd
            .best_config
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn.lock().await;
        let updated = conn
            .execute(
                "UPDATE benchmark_runs SET status = ?, finished_at = ?, best_score = ?, best_config = ? WHERE id = ?",
                libsql::params![
                    cmd.status.as_str(),
                    format_datetime(Utc::now()),
                    cmd.best_score,
                    best_config_json,
                    cmd.run_id.0
                ],
            )
            .await?;

        if updated == 0 {
            return Err(Error::RunNotFound(cmd.run_id.0));
        }
        debug!(status = cmd.status.as_str(), "finished run");
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_run(&self, run_id: RunId) -> Result<Option<RunRecord>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {RUN_COLUMNS} FROM benchmark_runs WHERE id = ?");
        let mut rows = conn.query(&sql, [run_id.0]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::parse_run(&row)?))
        } else {
            Ok(None)
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_results_for_run(&self, run_id: RunId) -> Result<Vec<BenchmarkResult>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM benchmark_results WHERE run_id = ? ORDER BY match_percentage DESC, id ASC"
        );
        let mut rows = conn.query(&sql, [run_id.0]).await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(Self::parse_result(&row)?);
        }
        Ok(results)
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_all_runs(&self) -> Result<Vec<RunRecord>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {RUN_COLUMNS} FROM benchmark_runs ORDER BY id DESC");
        let mut rows = conn.query(&sql, ()).await?;

        let mut runs = Vec::new();
        while let Some(row) = rows.next().await? {
            runs.push(Self::parse_run(&row)?);
        }
        Ok(runs)
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_best_config_for_model(
        &self,
        model_path: &str,
    ) -> Result<Option<Configuration>> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(
                "SELECT best_config FROM benchmark_runs WHERE model_path = ? AND best_config IS NOT NULL ORDER BY best_score DESC, id ASC LIMIT 1",
                [model_path],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            let json: String = row.get(0)?;
            Ok(Some(serde_json::from_str(&json)?))
        } else {
            Ok(None)
        }
    }
}

/// Bring the schema up to [`CURRENT_SCHEMA_VERSION`].
async fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(SCHEMA_VERSION_TABLE, ()).await?;

    let mut version = match read_schema_version(conn).await? {
        Some(found) if found > CURRENT_SCHEMA_VERSION => {
            return Err(Error::UnsupportedSchemaVersion {
                found,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        Some(found) => found,
        None => {
            apply_step(
                conn,
                1,
                &[SCHEMA_RUNS, SCHEMA_RESULTS, INDEX_RESULTS_RUN, INDEX_RESULTS_SCORE],
            )
            .await?;
            1
        }
    };

    for (target, statements) in MIGRATIONS {
        if *target <= version {
            continue;
        }
        apply_step(conn, *target, statements).await?;
        info!(from = version, to = target, "migrated benchmark schema");
        version = *target;
    }
    Ok(())
}

/// Run one schema step and record its version atomically.
async fn apply_step(conn: &Connection, version: i64, statements: &[&str]) -> Result<()> {
    let tx = conn.transaction().await?;
    for statement in statements {
        tx.execute(statement, ()).await?;
    }
    tx.execute("DELETE FROM schema_version", ()).await?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?)", [version])
        .await?;
    tx.commit().await?;
    Ok(())
}

async fn read_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut rows = conn.query("SELECT MAX(version) FROM schema_version", ()).await?;
    match rows.next().await? {
        Some(row) => Ok(row.get::<Option<i64>>(0)?),
        None => Ok(None),
    }
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::InvalidData(format!("invalid {}: {}", column, value)))
}

/// Format a datetime for storage.
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Parse a datetime from storage.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::InvalidData(format!("invalid datetime: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> TursoBenchmarkStore {
        TursoBenchmarkStore::new_memory().await.unwrap()
    }

    async fn create_sample_run(store: &TursoBenchmarkStore, model: &str) -> RunId {
        store
            .create_run(CreateRun::new(model, SweepMode::TemperatureOnly, 3, 2))
            .await
            .unwrap()
    }

    fn sample_result(run_id: RunId, name: &str, score: f64) -> BenchmarkResult {
        BenchmarkResult {
            run_id,
            test_case_id: TestCaseId::new(),
            test_case_name: name.to_string(),
            config: Configuration {
                temperature: 0.3,
                seed: 42,
                ..Default::default()
            },
            response: "4".to_string(),
            match_percentage: score,
            is_pass: score >= 80.0,
            metrics: PerformanceMetrics {
                tokens_per_second: 12.5,
                time_to_first_token_ms: 80.0,
                total_latency_ms: 900.0,
                token_count: 11,
            },
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn fresh_store_records_current_schema_version() {
        let store = create_test_store().await;

        assert_eq!(
            store.schema_version().await.unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }

    #[tokio::test]
    async fn store_returns_none_for_nonexistent_run() {
        let store = create_test_store().await;

        assert!(store.get_run(RunId(42)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_run_opens_running_record() {
        let store = create_test_store().await;

        let id = create_sample_run(&store, "/models/phi-3.gguf").await;
        let run = store.get_run(id).await.unwrap().unwrap();

        assert_eq!(run.id, id);
        assert_eq!(run.model_name, "phi-3");
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.sweep_mode, SweepMode::TemperatureOnly);
        assert_eq!(run.total_configs, 3);
        assert_eq!(run.total_tests, 2);
        assert!(run.finished_at.is_none());
        assert!(run.best_config.is_none());
    }

    #[tokio::test]
    async fn saved_result_roundtrips_every_field() {
        let store = create_test_store().await;
        let run_id = create_sample_run(&store, "m").await;
        let result = sample_result(run_id, "arithmetic", 91.25);

        store.save_result(&result).await.unwrap();
        let loaded = store.get_results_for_run(run_id).await.unwrap();

        assert_eq!(loaded.len(), 1);
        let loaded = &loaded[0];
        assert_eq!(loaded.config, result.config);
        assert_eq!(loaded.test_case_id, result.test_case_id);
        assert_eq!(loaded.metrics, result.metrics);
        assert_eq!(loaded.match_percentage, 91.25);
        assert!(loaded.is_pass);
        assert_eq!(
            loaded.timestamp.timestamp_micros(),
            result.timestamp.timestamp_micros()
        );
    }

    #[tokio::test]
    async fn results_are_ordered_best_first_and_scoped_to_run() {
        let store = create_test_store().await;
        let run_id = create_sample_run(&store, "m").await;
        let other_run = create_sample_run(&store, "m").await;

        for (name, score) in [("low", 10.0), ("high", 95.0), ("mid", 50.0)] {
            store.save_result(&sample_result(run_id, name, score)).await.unwrap();
        }
        store
            .save_result(&sample_result(other_run, "elsewhere", 100.0))
            .await
            .unwrap();

        let names: Vec<String> = store
            .get_results_for_run(run_id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.test_case_name)
            .collect();

        assert_eq!(names, vec!["high", "mid", "low"]);
    }

    #[tokio::test]
    async fn finish_run_records_best_configuration() {
        let store = create_test_store().await;
        let run_id = create_sample_run(&store, "m").await;
        let best = Configuration {
            temperature: 0.2,
            ..Default::default()
        };

        store
            .finish_run(FinishRun {
                run_id,
                status: RunStatus::Completed,
                best_score: Some(88.5),
                best_config: Some(best),
            })
            .await
            .unwrap();

        let run = store.get_run(run_id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.best_score, Some(88.5));
        assert_eq!(run.best_config, Some(best));
        assert!(run.finished_at.is_some());
    }

    #[tokio::test]
    async fn finish_run_fails_for_unknown_run() {
        let store = create_test_store().await;

        let err = store
            .finish_run(FinishRun {
                run_id: RunId(99),
                status: RunStatus::Cancelled,
                best_score: None,
                best_config: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RunNotFound(99)));
    }

    #[tokio::test]
    async fn all_runs_are_listed_most_recent_first() {
        let store = create_test_store().await;
        let first = create_sample_run(&store, "a").await;
        let second = create_sample_run(&store, "b").await;

        let ids: Vec<RunId> = store
            .get_all_runs()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();

        assert_eq!(ids, vec![second, first]);
    }

    #[tokio::test]
    async fn best_config_for_model_picks_highest_scoring_run() {
        let store = create_test_store().await;
        let model = "/models/llama.gguf";
        let mut configs = Vec::new();

        for (temperature, score) in [(0.1, 70.0), (0.5, 92.0), (0.9, 81.0)] {
            let run_id = create_sample_run(&store, model).await;
            let config = Configuration {
                temperature,
                ..Default::default()
            };
            configs.push(config);
            store
                .finish_run(FinishRun {
                    run_id,
                    status: RunStatus::Completed,
                    best_score: Some(score),
                    best_config: Some(config),
                })
                .await
                .unwrap();
        }
        // an unfinished run for the same model is ignored
        create_sample_run(&store, model).await;

        let best = store.get_best_config_for_model(model).await.unwrap();

        assert_eq!(best, Some(configs[1]));
    }

    #[tokio::test]
    async fn best_config_is_none_for_unknown_model() {
        let store = create_test_store().await;
        create_sample_run(&store, "known").await;

        assert!(store
            .get_best_config_for_model("unknown")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn file_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bench.db");

        let run_id = {
            let store = TursoBenchmarkStore::new_local(&path).await.unwrap();
            let run_id = create_sample_run(&store, "m").await;
            store.save_result(&sample_result(run_id, "t", 75.0)).await.unwrap();
            run_id
        };

        let reopened = TursoBenchmarkStore::new_local(&path).await.unwrap();
        assert_eq!(reopened.get_results_for_run(run_id).await.unwrap().len(), 1);
        assert_eq!(
            reopened.schema_version().await.unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }

    #[tokio::test]
    async fn version_one_database_is_migrated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.db");

        {
            let db = Builder::new_local(&path).build().await.unwrap();
            let conn = db.connect().unwrap();
            conn.execute(SCHEMA_VERSION_TABLE, ()).await.unwrap();
            conn.execute(SCHEMA_RUNS, ()).await.unwrap();
            conn.execute(SCHEMA_RESULTS, ()).await.unwrap();
            conn.execute("INSERT INTO schema_version (version) VALUES (1)", ())
                .await
                .unwrap();
            conn.execute(
                "INSERT INTO benchmark_runs (model_path, model_name, sweep_mode, started_at, total_configs, total_tests) VALUES ('m.gguf', 'm', 'all_combinations', '2025-01-01T00:00:00+00:00', 4, 2)",
                (),
            )
            .await
            .unwrap();
        }

        let store = TursoBenchmarkStore::new_local(&path).await.unwrap();
        let runs = store.get_all_runs().await.unwrap();

        assert_eq!(store.schema_version().await.unwrap(), Some(2));
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Completed);
        assert_eq!(runs[0].sweep_mode, SweepMode::AllCombinations);
    }

    #[tokio::test]
    async fn failed_migration_step_leaves_version_and_schema_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("interrupted.db");

        {
            let db = Builder::new_local(&path).build().await.unwrap();
            let conn = db.connect().unwrap();
            conn.execute(SCHEMA_VERSION_TABLE, ()).await.unwrap();
            apply_step(&conn, 1, &[SCHEMA_RUNS, SCHEMA_RESULTS]).await.unwrap();

            let result = apply_step(
                &conn,
                2,
                &[MIGRATIONS[0].1[0], "ALTER TABLE no_such_table ADD COLUMN x TEXT"],
            )
            .await;

            assert!(result.is_err());
            assert_eq!(read_schema_version(&conn).await.unwrap(), Some(1));
        }

        let store = TursoBenchmarkStore::new_local(&path).await.unwrap();
        assert_eq!(
            store.schema_version().await.unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
        let run_id = create_sample_run(&store, "m.gguf").await;
        assert!(store.get_run(run_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn newer_schema_version_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("future.db");

        {
            let db = Builder::new_local(&path).build().await.unwrap();
            let conn = db.connect().unwrap();
            conn.execute(SCHEMA_VERSION_TABLE, ()).await.unwrap();
            conn.execute("INSERT INTO schema_version (version) VALUES (99)", ())
                .await
                .unwrap();
        }

        let err = TursoBenchmarkStore::new_local(&path).await.err().unwrap();

        assert!(matches!(
            err,
            Error::UnsupportedSchemaVersion {
                found: 99,
                supported: CURRENT_SCHEMA_VERSION
            }
        ));
    }
}
