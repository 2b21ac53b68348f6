use sqlx::MySqlPool;

/// Drop and recreate the college_football target tables used by the
/// integration tests. Runs against the database named by `MYSQL_TEST_DSN`.
pub async fn reset_schema(pool: &MySqlPool) -> Result<(), sqlx::Error> {
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
        r#"CREATE TABLE conference (
                conference_id INT AUTO_INCREMENT PRIMARY KEY,
                conference_name VARCHAR(100) NOT NULL UNIQUE
            )"#,
        r#"CREATE TABLE team (
                team_id INT AUTO_INCREMENT PRIMARY KEY,
                team_name VARCHAR(100) NOT NULL UNIQUE
            )"#,
        r#"CREATE TABLE positions (
                position_id INT AUTO_INCREMENT PRIMARY KEY,
                position_name VARCHAR(50) NOT NULL UNIQUE
            )"#,
        r#"CREATE TABLE player (
                player_id INT AUTO_INCREMENT PRIMARY KEY,
                player_name VARCHAR(100) NOT NULL,
                player_hometown VARCHAR(100)
            )"#,
        r#"CREATE TABLE conference_team (
                conference_id INT NOT NULL,
                team_id INT NOT NULL,
                year INT,
                games_won INT,
                games_lost INT,
                FOREIGN KEY (conference_id) REFERENCES conference(conference_id),
                FOREIGN KEY (team_id) REFERENCES team(team_id)
            )"#,
        r#"CREATE TABLE team_player_position (
                team_id INT NOT NULL,
                position_id INT NOT NULL,
                player_id INT NOT NULL,
                year INT,
                height VARCHAR(20),
                weight INT,
                year_in_school VARCHAR(20),
                FOREIGN KEY (team_id) REFERENCES team(team_id),
                FOREIGN KEY (position_id) REFERENCES positions(position_id),
                FOREIGN KEY (player_id) REFERENCES player(player_id)
            )"#,
        r#"CREATE TABLE player_stats (
                player_id INT NOT NULL,
                year INT,
                rushing_yards INT,
                passing_yards INT,
                FOREIGN KEY (player_id) REFERENCES player(player_id)
            )"#,
    ];
    for stmt in creates {
        sqlx::query(stmt).execute(pool).await?;
    }

    Ok(())
}

/// Count rows in one table.
pub async fn count_rows(pool: &MySqlPool, table: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
}

/// Names of leftover staging tables for a target table, if any.
pub async fn staging_leftovers(
    pool: &MySqlPool,
    table: &str,
) -> Result<Vec<String>, sqlx::Error> {
    // Staging tables are named `{target}_{unix_seconds}`.
    sqlx::query_scalar(
        "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
         WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME REGEXP ?",
    )
    .bind(format!("^{table}_[0-9]+$"))
    .fetch_all(pool)
    .await
}
