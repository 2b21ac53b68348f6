//! Dependency-ordered snapshot loading.
//!
//! Foreign keys only exist after their referenced rows do, so the load
//! order is fixed: conference → team → positions → conference_team →
//! player → team_player_position → player_stats. After each entity table
//! is loaded it is read back to resolve the generated ids the dependent
//! tables reference. Each table's staging+apply+cleanup is atomic on its
//! own; a failure stops the run but leaves earlier tables loaded.

use crate::error::LoaderResult;
use crate::progress::LoadProgress;
use cfbload_core::{
    resolve_player_positions, resolve_player_stats, resolve_players, Dataset, HometownMatcher,
    ScrapeSnapshot,
};
use cfbload_sql::{insert_new, read_table, TableSchema};
use sqlx::mysql::MySqlPool;
use tracing::info;

/// Tunables for one load run.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Similarity threshold for hometown misspelling detection (0-1)
    pub hometown_threshold: f64,
    /// Resolve and report without writing to the database
    pub dry_run: bool,
    /// Show a progress bar across the table sequence
    pub show_progress: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            hometown_threshold: 0.8,
            dry_run: false,
            show_progress: false,
        }
    }
}

/// Per-table outcome of a load run.
#[derive(Debug, Clone)]
pub struct TableStat {
    /// Target table name
    pub table: String,
    /// Candidate rows offered to the insert (after resolution)
    pub offered: usize,
    /// Generated primary keys recovered, when unambiguous
    pub recovered_ids: Option<usize>,
}

/// Statistics accumulated over one load run.
#[derive(Debug, Clone, Default)]
pub struct LoadStats {
    /// Outcome per table, in load order
    pub tables: Vec<TableStat>,
    /// Candidate player rows dropped as duplicates during resolution
    pub duplicate_players_dropped: usize,
}

impl LoadStats {
    /// Total candidate rows offered across all tables.
    pub fn total_offered(&self) -> usize {
        self.tables.iter().map(|t| t.offered).sum()
    }

    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "Loaded {} tables ({} candidate rows, {} duplicate players dropped)",
            self.tables.len(),
            self.total_offered(),
            self.duplicate_players_dropped
        )
    }
}

/// Loads one scrape snapshot into the target database.
pub struct SnapshotLoader {
    pool: MySqlPool,
    config: LoadConfig,
}

// The seven target tables, in dependency order.
const LOAD_SEQUENCE_LEN: u64 = 7;

impl SnapshotLoader {
    /// Create a loader over an established connection pool.
    pub fn new(pool: MySqlPool, config: LoadConfig) -> Self {
        SnapshotLoader { pool, config }
    }

    /// Run the full dependency-ordered load.
    pub async fn load(&self, snapshot: &ScrapeSnapshot) -> LoaderResult<LoadStats> {
        let mut stats = LoadStats::default();
        let matcher = HometownMatcher::new(self.config.hometown_threshold);

        let (players, report) = resolve_players(snapshot, &matcher)?;
        stats.duplicate_players_dropped = report.total_dropped();
        info!(
            players = players.len(),
            exact = report.exact_dropped,
            per_role = report.role_dropped,
            fuzzy = report.fuzzy_dropped,
            "resolved canonical player set"
        );

        if self.config.dry_run {
            return self.dry_run_report(snapshot, players, stats).await;
        }

        let progress = self
            .config
            .show_progress
            .then(|| LoadProgress::new(LOAD_SEQUENCE_LEN));

        // Independent entity tables first.
        info!("loading conference table");
        self.load_table(&mut stats, &snapshot.conferences, "conference", &["conference_name"])
            .await?;
        tick(progress.as_ref(), "conference");

        info!("loading team table");
        self.load_table(&mut stats, &snapshot.teams, "team", &["team_name"])
            .await?;
        tick(progress.as_ref(), "team");

        info!("loading positions table");
        self.load_table(&mut stats, &snapshot.positions, "positions", &["position_name"])
            .await?;
        tick(progress.as_ref(), "positions");

        // conference_team references conference and team ids.
        info!("loading conference_team table");
        let conferences = read_table(&self.pool, "conference").await?;
        let teams = read_table(&self.pool, "team").await?;
        let membership = snapshot
            .conference_teams
            .inner_join(&conferences, &["conference_name"])?
            .inner_join(&teams, &["team_name"])?;
        self.load_table(
            &mut stats,
            &membership,
            "conference_team",
            &["conference_id", "team_id"],
        )
        .await?;
        tick(progress.as_ref(), "conference_team");

        info!("loading player table");
        self.load_table(
            &mut stats,
            &players,
            "player",
            &["player_name", "player_hometown"],
        )
        .await?;
        tick(progress.as_ref(), "player");

        // Who played what for whom: needs team, position and player ids.
        info!("loading team_player_position table");
        let positions = read_table(&self.pool, "positions").await?;
        let players_db = read_table(&self.pool, "player").await?;
        let associations = resolve_player_positions(snapshot)?
            .inner_join(&teams, &["team_name"])?
            .inner_join(&positions, &["position_name"])?
            .inner_join(&players_db, &["player_name", "player_hometown"])?;
        self.load_table(
            &mut stats,
            &associations,
            "team_player_position",
            &["team_id", "position_id", "player_id", "year"],
        )
        .await?;
        tick(progress.as_ref(), "team_player_position");

        // Statistics columns are whatever the target schema says they are.
        info!("loading player_stats table");
        let stats_schema = TableSchema::introspect(&self.pool, "player_stats").await?;
        let stat_columns: Vec<String> =
            stats_schema.column_names().map(str::to_string).collect();
        let player_stats = resolve_player_stats(snapshot, &stat_columns)?
            .inner_join(&players_db, &["player_name", "player_hometown"])?;
        self.load_table(
            &mut stats,
            &player_stats,
            "player_stats",
            &["player_id", "year"],
        )
        .await?;
        tick(progress.as_ref(), "player_stats");

        if let Some(bar) = progress {
            bar.finish();
        }
        info!(summary = %stats.summary(), "load complete");
        Ok(stats)
    }

    async fn load_table(
        &self,
        stats: &mut LoadStats,
        dataset: &Dataset,
        table: &str,
        identity_columns: &[&str],
    ) -> LoaderResult<()> {
        let recovered = insert_new(&self.pool, dataset, table, identity_columns).await?;
        stats.tables.push(TableStat {
            table: table.to_string(),
            offered: dataset.len(),
            recovered_ids: recovered.map(|ids| ids.len()),
        });
        Ok(())
    }

    // A dry run resolves everything and introspects the stats schema, but
    // writes nothing.
    async fn dry_run_report(
        &self,
        snapshot: &ScrapeSnapshot,
        players: Dataset,
        mut stats: LoadStats,
    ) -> LoaderResult<LoadStats> {
        let associations = resolve_player_positions(snapshot)?;
        let stats_schema = TableSchema::introspect(&self.pool, "player_stats").await?;
        let stat_columns: Vec<String> =
            stats_schema.column_names().map(str::to_string).collect();
        let player_stats = resolve_player_stats(snapshot, &stat_columns)?;

        for (table, offered) in [
            ("conference", snapshot.conferences.len()),
            ("team", snapshot.teams.len()),
            ("positions", snapshot.positions.len()),
            ("conference_team", snapshot.conference_teams.len()),
            ("player", players.len()),
            ("team_player_position", associations.len()),
            ("player_stats", player_stats.len()),
        ] {
            stats.tables.push(TableStat {
                table: table.to_string(),
                offered,
                recovered_ids: None,
            });
        }
        info!(summary = %stats.summary(), "dry run complete, nothing written");
        Ok(stats)
    }
}

fn tick(progress: Option<&LoadProgress>, table: &str) {
    if let Some(bar) = progress {
        bar.table_done(table);
    }
}
