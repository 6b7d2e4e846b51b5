use std::env;
use std::path::Path;

use chrono::NaiveDate;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::errors::Result;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl AppConfig {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        dotenvy::from_path(path.join(".env")).ok();
        dotenvy::dotenv().ok();

        let mut config: AppConfig = Config::builder()
            .add_source(
                File::with_name(path.join("config/default").to_string_lossy().as_ref())
                    .required(false),
            )
            .add_source(
                File::with_name(path.join("config/local").to_string_lossy().as_ref())
                    .required(false),
            )
            .add_source(Environment::default().separator("__"))
            .build()?
            .try_deserialize()?;

        if config.github.token.is_none() {
            config.github.token = env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "GithubConfig::default_endpoint")]
    pub endpoint: String,
    #[serde(default = "GithubConfig::default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub token: Option<String>,
}

impl GithubConfig {
    fn default_endpoint() -> String {
        "https://api.github.com/graphql".to_string()
    }

    fn default_user_agent() -> String {
        "github-repo-fetcher".to_string()
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            user_agent: Self::default_user_agent(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Repository nodes per page. Each node embeds a README blob, so this
    /// stays well under the API's page ceiling.
    #[serde(default = "FetchConfig::default_page_size")]
    pub page_size: u32,
    #[serde(default = "FetchConfig::default_account_page_size")]
    pub account_page_size: u32,
    #[serde(default = "FetchConfig::default_checkpoint_interval")]
    pub checkpoint_interval: usize,
    #[serde(default = "FetchConfig::default_min_rate_limit")]
    pub min_rate_limit: i64,
    #[serde(default = "FetchConfig::default_search_ceiling")]
    pub search_ceiling: u64,
    #[serde(default = "FetchConfig::default_discovery_start")]
    pub discovery_start: NaiveDate,
}

impl FetchConfig {
    const fn default_page_size() -> u32 {
        10
    }

    const fn default_account_page_size() -> u32 {
        100
    }

    const fn default_checkpoint_interval() -> usize {
        100
    }

    const fn default_min_rate_limit() -> i64 {
        100
    }

    const fn default_search_ceiling() -> u64 {
        1000
    }

    fn default_discovery_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2008, 1, 1).unwrap_or_default()
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: Self::default_page_size(),
            account_page_size: Self::default_account_page_size(),
            checkpoint_interval: Self::default_checkpoint_interval(),
            min_rate_limit: Self::default_min_rate_limit(),
            search_ceiling: Self::default_search_ceiling(),
            discovery_start: Self::default_discovery_start(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "RetryConfig::default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "RetryConfig::default_base_delay_secs")]
    pub base_delay_secs: f64,
    #[serde(default = "RetryConfig::default_max_delay_secs")]
    pub max_delay_secs: f64,
    #[serde(default = "RetryConfig::default_multiplier")]
    pub multiplier: f64,
}

impl RetryConfig {
    const fn default_max_retries() -> u32 {
        3
    }

    const fn default_base_delay_secs() -> f64 {
        2.0
    }

    const fn default_max_delay_secs() -> f64 {
        60.0
    }

    const fn default_multiplier() -> f64 {
        2.0
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: Self::default_max_retries(),
            base_delay_secs: Self::default_base_delay_secs(),
            max_delay_secs: Self::default_max_delay_secs(),
            multiplier: Self::default_multiplier(),
        }
    }
}
