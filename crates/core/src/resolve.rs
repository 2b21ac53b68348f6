//! Entity resolution over scraped player records.
//!
//! Roster tables repeat players across years and teams, and free-text
//! hometown fields drift between seasons ("Downingtown, PA" vs
//! "Downing Town, PA"). This module folds the per-year, per-team rosters
//! into canonical row sets for the `player`, `team_player_position` and
//! `player_stats` tables. The database is never touched here; the caller
//! supplies the statistic column names it discovered from the target schema.

use crate::dataset::{Dataset, DatasetError, Value};
use crate::snapshot::ScrapeSnapshot;
use std::collections::HashMap;
use tracing::debug;

/// Fuzzy comparison of two hometown strings.
///
/// Two measures are taken: the normalized edit-distance ratio over the whole
/// strings, and a token-set ratio that ignores word order and repeated
/// tokens. Either measure exceeding the threshold marks the pair as a likely
/// duplicate. The threshold is a 0–1 similarity; 0.8 by default.
#[derive(Debug, Clone, Copy)]
pub struct HometownMatcher {
    threshold: f64,
}

impl Default for HometownMatcher {
    fn default() -> Self {
        HometownMatcher { threshold: 0.8 }
    }
}

impl HometownMatcher {
    /// Create a matcher with a custom similarity threshold (0–1).
    pub fn new(threshold: f64) -> Self {
        HometownMatcher { threshold }
    }

    /// The configured similarity threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether two hometown strings likely name the same place.
    pub fn is_likely_duplicate(&self, town_a: &str, town_b: &str) -> bool {
        let a = town_a.trim().to_lowercase();
        let b = town_b.trim().to_lowercase();
        strsim::normalized_levenshtein(&a, &b) > self.threshold
            || token_set_ratio(&a, &b) > self.threshold
    }
}

// Token-set similarity: compare the sorted token intersection against each
// side's full sorted token string, and the two full strings against each
// other, taking the best score. Word order and duplicated tokens stop
// mattering, so "Downing Town, PA" still lines up with "Downingtown, PA".
fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: std::collections::BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: std::collections::BTreeSet<&str> = b.split_whitespace().collect();

    let common: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    let base = common.join(" ");
    let combined_a = join_nonempty(&base, &only_a.join(" "));
    let combined_b = join_nonempty(&base, &only_b.join(" "));

    strsim::normalized_levenshtein(&base, &combined_a)
        .max(strsim::normalized_levenshtein(&base, &combined_b))
        .max(strsim::normalized_levenshtein(&combined_a, &combined_b))
}

fn join_nonempty(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

/// Counts of rows removed while resolving the canonical player set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveReport {
    /// Rows repeating an earlier (name, hometown) pair
    pub exact_dropped: usize,
    /// Rows repeating an earlier (name, team, position) triple
    pub role_dropped: usize,
    /// Rows dropped by the fuzzy hometown comparison
    pub fuzzy_dropped: usize,
}

impl ResolveReport {
    /// Total number of dropped rows.
    pub fn total_dropped(&self) -> usize {
        self.exact_dropped + self.role_dropped + self.fuzzy_dropped
    }
}

// Roster tables come off the scraper with `name` and `position` columns;
// the relational schema calls these `player_name` and `position_name`.
fn normalized_roster(roster: &Dataset) -> Dataset {
    let mut ds = roster.clone();
    if ds.has_column("name") && !ds.has_column("player_name") {
        ds.rename_column("name", "player_name")
            .expect("player_name is absent");
    }
    if ds.has_column("position") && !ds.has_column("position_name") {
        ds.rename_column("position", "position_name")
            .expect("position_name is absent");
    }
    ds
}

/// Resolve the canonical player set: one `(player_name, player_hometown)`
/// row per distinct person, as best the data allows.
///
/// Duplicates fall in three passes: exact repeats of (name, hometown),
/// repeats of (name, team, position) — biographical fields drift year to
/// year but that triple identifies one person-season-role — and a fuzzy
/// hometown comparison for names left appearing exactly twice. Names
/// appearing more than twice with distinct hometowns are left alone; those
/// are as likely distinct people as misspellings.
pub fn resolve_players(
    snapshot: &ScrapeSnapshot,
    matcher: &HometownMatcher,
) -> Result<(Dataset, ResolveReport), DatasetError> {
    let mut players = Dataset::new(vec!["player_name", "player_hometown", "team_name", "position_name"]);
    for (_, team, roster) in snapshot.roster_iter() {
        let ds = normalized_roster(roster)
            .select_present(&["player_name", "player_hometown", "position_name"])
            .with_column("team_name", Value::Text(team.to_string()))?;
        players.append(&ds);
    }

    let exact_dropped = players.dedup_on(&["player_name", "player_hometown"])?;
    let role_dropped =
        players.dedup_on_present(&["player_name", "team_name", "position_name"]);

    // Names now appearing exactly twice are candidate misspelling pairs.
    let hometown_idx = players
        .column_index("player_hometown")
        .expect("column exists");
    let mut occurrences: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, name) in players.column_values("player_name")?.iter().enumerate() {
        occurrences.entry(name.to_string()).or_default().push(idx);
    }

    let mut doomed = Vec::new();
    for indices in occurrences.values() {
        let &[first, second] = indices.as_slice() else {
            continue;
        };
        let town_a = players.rows()[first][hometown_idx].to_string();
        let town_b = players.rows()[second][hometown_idx].to_string();
        if matcher.is_likely_duplicate(&town_a, &town_b) {
            doomed.push(second);
        }
    }
    debug!(
        dropped = doomed.len(),
        "dropping players with likely-misspelled hometowns"
    );
    let report = ResolveReport {
        exact_dropped,
        role_dropped,
        fuzzy_dropped: doomed.len(),
    };
    players.drop_rows(&doomed);

    Ok((players.select(&["player_name", "player_hometown"])?, report))
}

/// Resolve who played what for whom: one row per
/// `(player, team, position, year)` with the season's biographical fields.
pub fn resolve_player_positions(snapshot: &ScrapeSnapshot) -> Result<Dataset, DatasetError> {
    let fields = [
        "player_name",
        "player_hometown",
        "position_name",
        "height",
        "weight",
        "year_in_school",
    ];

    let mut associations = Dataset::default();
    for (year, team, roster) in snapshot.roster_iter() {
        let ds = normalized_roster(roster)
            .select_present(&fields)
            .with_column("year", Value::Int(year))?
            .with_column("team_name", Value::Text(team.to_string()))?;
        associations.append(&ds);
    }

    let all: Vec<String> = associations.columns().to_vec();
    let refs: Vec<&str> = all.iter().map(String::as_str).collect();
    if !refs.is_empty() {
        let dropped = associations.dedup_on(&refs)?;
        debug!(dropped, "deduplicated player-position associations");
    }
    Ok(associations)
}

/// Resolve per-player season statistics, narrowed to the statistic columns
/// the target `player_stats` schema actually has. Rows carrying no
/// statistic at all are dropped; there is nothing to persist for them.
pub fn resolve_player_stats(
    snapshot: &ScrapeSnapshot,
    stat_schema_columns: &[String],
) -> Result<Dataset, DatasetError> {
    // Identity and FK columns are resolved later; only genuine statistic
    // fields count toward the "all missing" filter.
    let stat_fields: Vec<&str> = stat_schema_columns
        .iter()
        .map(String::as_str)
        .filter(|c| !matches!(*c, "player_id" | "year" | "player_name" | "player_hometown"))
        .collect();

    let mut stats = Dataset::default();
    let mut empty_rows = 0usize;
    for (year, _, roster) in snapshot.roster_iter() {
        let ds = normalized_roster(roster);
        let mut wanted: Vec<&str> = vec!["player_name", "player_hometown"];
        wanted.extend(stat_fields.iter().copied());
        let mut ds = ds
            .select_present(&wanted)
            .with_column("year", Value::Int(year))?;

        let present_stats: Vec<&str> = stat_fields
            .iter()
            .copied()
            .filter(|c| ds.has_column(c))
            .collect();
        if present_stats.is_empty() {
            // Roster with no statistic columns at all; nothing to load.
            empty_rows += ds.len();
            continue;
        }
        empty_rows += ds.drop_rows_all_missing(&present_stats)?;
        stats.append(&ds);
    }

    let all: Vec<String> = stats.columns().to_vec();
    let refs: Vec<&str> = all.iter().map(String::as_str).collect();
    if !refs.is_empty() {
        stats.dedup_on(&refs)?;
    }
    debug!(empty_rows, "dropped stat rows with no meaningful statistics");
    Ok(stats)
}
