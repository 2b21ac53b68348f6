//! CLI binary for loading scraped college football statistics into MySQL.

use cfbload_core::ScrapeSnapshot;
use cfbload_loader::cli::Cli;
use cfbload_loader::{LoadConfig, SnapshotLoader};
use cfbload_sql::{connect_with_retry, DatabaseConfig};
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    cli.validate()?;

    info!(input = %cli.input.display(), "reading scrape snapshot");
    let json = std::fs::read_to_string(&cli.input)?;
    let snapshot = ScrapeSnapshot::from_json(&json)?;
    info!(
        conferences = snapshot.conferences.len(),
        teams = snapshot.teams.len(),
        rosters = snapshot.roster_count(),
        "snapshot parsed"
    );

    let config = DatabaseConfig::new(
        cli.host.clone(),
        cli.port,
        cli.user.clone(),
        cli.password.clone(),
        cli.database.clone(),
    );
    let pool = connect_with_retry(&config, cli.connect_attempts).await?;

    if cli.dry_run {
        info!("DRY RUN MODE - no database modifications will be made");
    }

    let loader = SnapshotLoader::new(
        pool,
        LoadConfig {
            hometown_threshold: cli.hometown_threshold,
            dry_run: cli.dry_run,
            show_progress: !cli.verbose,
        },
    );
    let stats = loader.load(&snapshot).await?;

    println!("\n{}", stats.summary());
    for table in &stats.tables {
        match table.recovered_ids {
            Some(count) => println!(
                "  {:<22} {:>6} rows offered, {count} new ids",
                table.table, table.offered
            ),
            None => println!("  {:<22} {:>6} rows offered", table.table, table.offered),
        }
    }

    Ok(())
}
