use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub scoring: ScoringConfig,
    pub ocr: OcrConfig,
    pub leaderboard: LeaderboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "ecoshare.db".to_string(),
            busy_timeout_ms: 5000,
        }
    }
}

/// Points awarded per receipt attribute. A submission earns the sum of the
/// weight of its certification, purchase mode and bill type.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub no_certification: u64,
    pub usda_organic: u64,
    pub energy_star: u64,
    pub fair_trade: u64,
    pub local_store: u64,
    pub offline: u64,
    pub online: u64,
    pub purchase_bill: u64,
    pub consumable_bill: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            no_certification: 0,
            usda_organic: 10,
            energy_star: 8,
            fair_trade: 6,
            local_store: 5,
            offline: 3,
            online: 1,
            purchase_bill: 2,
            consumable_bill: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OcrConfig {
    pub timeout_ms: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self { timeout_ms: 30_000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LeaderboardConfig {
    pub default_size: usize,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self { default_size: 10 }
    }
}

impl Config {
    /// Layered load: `.env`, then the optional file at `path`, then
    /// `ECOSHARE__SECTION__KEY` environment variables.
    pub fn load(path: &str) -> crate::Result<Self> {
        dotenv::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("ECOSHARE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.database.busy_timeout_ms)
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_millis(self.ocr.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load("does/not/exist").unwrap();
        assert_eq!(config.scoring, ScoringConfig::default());
        assert_eq!(config.leaderboard.default_size, 10);
        assert_eq!(config.ocr_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[database]\npath = \"custom.db\"\n\n[scoring]\nusda_organic = 25\n",
        )
        .unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.database.path, "custom.db");
        assert_eq!(config.scoring.usda_organic, 25);
        assert_eq!(config.scoring.fair_trade, 6);
    }
}
