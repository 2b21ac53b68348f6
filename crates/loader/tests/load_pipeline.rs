//! End-to-end load pipeline test against a live MySQL database.
//!
//! Gated on `MYSQL_TEST_DSN`; passes vacuously without it.

use std::collections::BTreeMap;

use cfbload_core::{Dataset, ScrapeSnapshot, Value};
use cfbload_loader::{LoadConfig, SnapshotLoader};
use serial_test::serial;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use tokio::runtime::Builder;

async fn reset_schema(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    let drops = [
        "DROP TABLE IF EXISTS player_stats",
        "DROP TABLE IF EXISTS team_player_position",
        "DROP TABLE IF EXISTS conference_team",
        "DROP TABLE IF EXISTS player",
        "DROP TABLE IF EXISTS positions",
        "DROP TABLE IF EXISTS team",
        "DROP TABLE IF EXISTS conference",
    ];
    for stmt in drops {
        sqlx::query(stmt).execute(pool).await?;
    }
    let creates = [
        "CREATE TABLE conference (conference_id INT AUTO_INCREMENT PRIMARY KEY, \
         conference_name VARCHAR(100) NOT NULL UNIQUE)",
        "CREATE TABLE team (team_id INT AUTO_INCREMENT PRIMARY KEY, \
         team_name VARCHAR(100) NOT NULL UNIQUE)",
        "CREATE TABLE positions (position_id INT AUTO_INCREMENT PRIMARY KEY, \
         position_name VARCHAR(50) NOT NULL UNIQUE)",
        "CREATE TABLE player (player_id INT AUTO_INCREMENT PRIMARY KEY, \
         player_name VARCHAR(100) NOT NULL, player_hometown VARCHAR(100))",
        "CREATE TABLE conference_team (conference_id INT NOT NULL, team_id INT NOT NULL, \
         year INT, games_won INT, games_lost INT)",
        "CREATE TABLE team_player_position (team_id INT NOT NULL, position_id INT NOT NULL, \
         player_id INT NOT NULL, year INT, height VARCHAR(20), weight INT, \
         year_in_school VARCHAR(20))",
        "CREATE TABLE player_stats (player_id INT NOT NULL, year INT, \
         rushing_yards INT, passing_yards INT)",
    ];
    for stmt in creates {
        sqlx::query(stmt).execute(pool).await?;
    }
    Ok(())
}

fn single_column(name: &str, values: &[&str]) -> Dataset {
    let mut ds = Dataset::new(vec![name]);
    for value in values {
        ds.push_row(vec![(*value).into()]).unwrap();
    }
    ds
}

fn sample_snapshot() -> ScrapeSnapshot {
    let mut conference_teams = Dataset::new(vec![
        "conference_name",
        "team_name",
        "year",
        "games_won",
        "games_lost",
    ]);
    conference_teams
        .push_row(vec![
            "SEC".into(),
            "Alabama".into(),
            Value::Int(2017),
            Value::Int(11),
            Value::Int(2),
        ])
        .unwrap();

    let mut roster_2016 = Dataset::new(vec![
        "name",
        "player_hometown",
        "position",
        "height",
        "weight",
        "year_in_school",
        "rushing_yards",
    ]);
    roster_2016
        .push_row(vec![
            "D. Harris".into(),
            "Downingtown, PA".into(),
            "RB".into(),
            "5-11".into(),
            Value::Int(214),
            "SO".into(),
            Value::Int(1037),
        ])
        .unwrap();

    let mut roster_2017 = Dataset::new(vec![
        "name",
        "player_hometown",
        "position",
        "height",
        "weight",
        "year_in_school",
        "rushing_yards",
        "passing_yards",
    ]);
    // Same player, hometown misspelled this season.
    roster_2017
        .push_row(vec![
            "D. Harris".into(),
            "Downing Town, PA".into(),
            "RB".into(),
            "5-11".into(),
            Value::Int(221),
            "JR".into(),
            Value::Int(1000),
            Value::Null,
        ])
        .unwrap();
    roster_2017
        .push_row(vec![
            "J. Hurts".into(),
            "Houston, TX".into(),
            "QB".into(),
            "6-2".into(),
            Value::Int(218),
            "SO".into(),
            Value::Int(855),
            Value::Int(2081),
        ])
        .unwrap();
    // No statistics at all: the row must not reach player_stats.
    roster_2017
        .push_row(vec![
            "B. Walkon".into(),
            "Tuscaloosa, AL".into(),
            "QB".into(),
            "6-0".into(),
            Value::Int(190),
            "FR".into(),
            Value::Null,
            Value::Null,
        ])
        .unwrap();

    let mut rosters = BTreeMap::new();
    rosters.insert(
        2016,
        BTreeMap::from([("Alabama".to_string(), roster_2016)]),
    );
    rosters.insert(
        2017,
        BTreeMap::from([("Alabama".to_string(), roster_2017)]),
    );

    ScrapeSnapshot {
        conferences: single_column("conference_name", &["SEC"]),
        teams: single_column("team_name", &["Alabama"]),
        positions: single_column("position_name", &["QB", "RB"]),
        conference_teams,
        rosters,
    }
}

#[test]
#[serial]
fn snapshot_load_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let Ok(dsn) = std::env::var("MYSQL_TEST_DSN") else {
        return Ok(());
    };
    let runtime = Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(async {
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .connect(&dsn)
            .await?;
        reset_schema(&pool).await?;

        let loader = SnapshotLoader::new(pool.clone(), LoadConfig::default());
        let stats = loader.load(&sample_snapshot()).await?;
        assert_eq!(stats.tables.len(), 7);

        let count = |table: &'static str| {
            let pool = pool.clone();
            async move {
                sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
                    .fetch_one(&pool)
                    .await
            }
        };

        assert_eq!(count("conference").await?, 1);
        assert_eq!(count("team").await?, 1);
        assert_eq!(count("positions").await?, 2);
        assert_eq!(count("conference_team").await?, 1);

        // D. Harris (misspelled hometown variants merged) + J. Hurts +
        // B. Walkon.
        assert_eq!(count("player").await?, 3);

        // One row per (player, team, position, year) that resolved: the
        // 2017 D. Harris row joins under the 2016 hometown spelling only,
        // so 2016 Harris + 2017 Hurts + 2017 Walkon survive.
        let tpp: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM team_player_position WHERE team_id IS NOT NULL",
        )
        .fetch_one(&pool)
        .await?;
        assert!(tpp >= 3);

        // Walkon had no statistics; only rows with signal landed.
        assert_eq!(count("player_stats").await?, 2);

        // Every stats row references a real player id.
        let orphans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM player_stats ps \
             LEFT JOIN player p ON ps.player_id = p.player_id \
             WHERE p.player_id IS NULL",
        )
        .fetch_one(&pool)
        .await?;
        assert_eq!(orphans, 0);

        // Loading the same snapshot again must not add rows anywhere.
        let loader = SnapshotLoader::new(pool.clone(), LoadConfig::default());
        loader.load(&sample_snapshot()).await?;
        assert_eq!(count("conference").await?, 1);
        assert_eq!(count("player").await?, 3);
        assert_eq!(count("player_stats").await?, 2);

        Ok::<_, Box<dyn std::error::Error>>(())
    })
}
