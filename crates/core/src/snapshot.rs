//! The scraper hand-off structure.
//!
//! A scrape run serializes its results to a JSON snapshot; the loader never
//! talks to the scraper directly. Roster tables are column-heterogeneous:
//! different years and teams expose different statistic columns.

use crate::dataset::Dataset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One scrape run's output: four flat tables plus per-year, per-team rosters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeSnapshot {
    /// Conference names (`conference_name`)
    pub conferences: Dataset,
    /// Team names (`team_name`)
    pub teams: Dataset,
    /// Position names (`position_name`)
    pub positions: Dataset,
    /// Per-year conference membership with win/loss records
    /// (`conference_name`, `team_name`, `year`, `games_won`, `games_lost`)
    pub conference_teams: Dataset,
    /// `year -> team_name -> roster table`. Roster columns vary; `name`,
    /// `player_hometown` and `position` are expected, statistics are not.
    pub rosters: BTreeMap<i64, BTreeMap<String, Dataset>>,
}

impl ScrapeSnapshot {
    /// Parse a snapshot from its JSON serialization.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Total number of roster tables across all years and teams.
    pub fn roster_count(&self) -> usize {
        self.rosters.values().map(|teams| teams.len()).sum()
    }

    /// Iterate roster tables as `(year, team_name, dataset)`.
    pub fn roster_iter(&self) -> impl Iterator<Item = (i64, &str, &Dataset)> {
        self.rosters.iter().flat_map(|(year, teams)| {
            teams
                .iter()
                .map(move |(team, ds)| (*year, team.as_str(), ds))
        })
    }
}
