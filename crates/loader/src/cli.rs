//! CLI interface for the snapshot loader.

use clap::Parser;
use std::path::PathBuf;

/// Load a scraped college football snapshot into MySQL.
#[derive(Parser, Debug)]
#[command(name = "cfbload")]
#[command(about = "Load scraped college football statistics into MySQL", long_about = None)]
pub struct Cli {
    /// Database username
    #[arg(short, long)]
    pub user: String,

    /// Database user password
    #[arg(short, long)]
    pub password: String,

    /// Database host server address
    #[arg(short = 'l', long, default_value = "localhost")]
    pub host: String,

    /// Database port
    #[arg(long, default_value_t = 3306)]
    pub port: u16,

    /// Database name
    #[arg(short, long, default_value = "college_football")]
    pub database: String,

    /// Path to the JSON snapshot produced by the scraper
    #[arg(short, long)]
    pub input: PathBuf,

    /// Similarity threshold (0-1) for hometown misspelling detection
    #[arg(long, default_value_t = 0.8)]
    pub hometown_threshold: f64,

    /// Resolve and report without writing to the database
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum connection attempts before giving up
    #[arg(long, default_value_t = 4)]
    pub connect_attempts: u32,

    /// Enable verbose logging (includes executed SQL)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Validate arguments and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.hometown_threshold) {
            return Err(format!(
                "--hometown-threshold must be between 0 and 1, got {}",
                self.hometown_threshold
            ));
        }
        if self.connect_attempts == 0 {
            return Err("--connect-attempts must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(threshold: f64, attempts: u32) -> Cli {
        Cli {
            user: "ffineis".to_string(),
            password: "password".to_string(),
            host: "localhost".to_string(),
            port: 3306,
            database: "college_football".to_string(),
            input: PathBuf::from("./cfbstats_122017.json"),
            hometown_threshold: threshold,
            dry_run: false,
            connect_attempts: attempts,
            verbose: false,
        }
    }

    #[test]
    fn default_style_args_validate() {
        assert!(args(0.8, 4).validate().is_ok());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        assert!(args(80.0, 4).validate().is_err());
        assert!(args(-0.1, 4).validate().is_err());
    }

    #[test]
    fn zero_connect_attempts_is_rejected() {
        assert!(args(0.8, 0).validate().is_err());
    }
}
