//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::services::fraud::BlacklistEntry;
use crate::services::station_progressor::DEFAULT_NEAR_END_THRESHOLD;
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct TrainConfig {
    pub number: String,
    pub name: String,
    /// Journey date the chart was prepared for; defaults to today (UTC)
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    pub stations: Vec<String>,
    /// Last station of this TT's segment (empty = terminal)
    #[serde(default)]
    pub segment_end: String,
    #[serde(default = "default_near_end_threshold")]
    pub near_end_threshold: usize,
}

fn default_near_end_threshold() -> usize {
    DEFAULT_NEAR_END_THRESHOLD
}

#[derive(Debug, Clone, Deserialize)]
pub struct DutyConfig {
    pub tt_id: String,
    pub tt_name: String,
    /// Coach the TT starts checking
    #[serde(default)]
    pub coach: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaresConfig {
    #[serde(default = "default_rac_upgrade_fee")]
    pub rac_upgrade_fee_inr: u64,
    #[serde(default = "default_penalty")]
    pub default_penalty_inr: u64,
}

impl Default for FaresConfig {
    fn default() -> Self {
        Self { rac_upgrade_fee_inr: default_rac_upgrade_fee(), default_penalty_inr: default_penalty() }
    }
}

fn default_rac_upgrade_fee() -> u64 {
    250
}

fn default_penalty() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FraudConfig {
    #[serde(default)]
    pub blacklist: Vec<BlacklistEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Log a metrics summary every N applied events (0 to disable)
    #[serde(default = "default_report_every")]
    pub report_every_events: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { report_every_events: default_report_every() }
    }
}

fn default_report_every() -> u64 {
    50
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    pub train: TrainConfig,
    pub route: RouteConfig,
    pub duty: DutyConfig,
    #[serde(default)]
    pub fares: FaresConfig,
    #[serde(default)]
    pub fraud: FraudConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    train_number: String,
    train_name: String,
    journey_date: NaiveDate,
    stations: Vec<String>,
    segment_end: String,
    near_end_threshold: usize,
    tt_id: String,
    tt_name: String,
    start_coach: Option<String>,
    rac_upgrade_fee_inr: u64,
    default_penalty_inr: u64,
    blacklist: Vec<BlacklistEntry>,
    report_every_events: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            train_number: "12951".to_string(),
            train_name: "Mumbai Rajdhani".to_string(),
            journey_date: Utc::now().date_naive(),
            stations: ["NDLS", "KOTA", "RTM", "BRC", "ST", "BVI", "MMCT"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            segment_end: "BRC".to_string(),
            near_end_threshold: DEFAULT_NEAR_END_THRESHOLD,
            tt_id: "TT0000".to_string(),
            tt_name: "Duty TT".to_string(),
            start_coach: None,
            rac_upgrade_fee_inr: default_rac_upgrade_fee(),
            default_penalty_inr: default_penalty(),
            blacklist: Vec::new(),
            report_every_events: default_report_every(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        if toml_config.route.stations.is_empty() {
            anyhow::bail!("config file {} lists no stations", path.display());
        }

        Ok(Self {
            train_number: toml_config.train.number,
            train_name: toml_config.train.name,
            journey_date: toml_config.train.date.unwrap_or_else(|| Utc::now().date_naive()),
            stations: toml_config.route.stations,
            segment_end: toml_config.route.segment_end,
            near_end_threshold: toml_config.route.near_end_threshold,
            tt_id: toml_config.duty.tt_id,
            tt_name: toml_config.duty.tt_name,
            start_coach: toml_config.duty.coach.filter(|c| !c.trim().is_empty()),
            rac_upgrade_fee_inr: toml_config.fares.rac_upgrade_fee_inr,
            default_penalty_inr: toml_config.fares.default_penalty_inr,
            blacklist: toml_config.fraud.blacklist,
            report_every_events: toml_config.metrics.report_every_events,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    pub fn train_number(&self) -> &str {
        &self.train_number
    }

    pub fn train_name(&self) -> &str {
        &self.train_name
    }

    pub fn journey_date(&self) -> NaiveDate {
        self.journey_date
    }

    pub fn stations(&self) -> &[String] {
        &self.stations
    }

    pub fn segment_end(&self) -> &str {
        &self.segment_end
    }

    pub fn near_end_threshold(&self) -> usize {
        self.near_end_threshold
    }

    pub fn tt_id(&self) -> &str {
        &self.tt_id
    }

    pub fn tt_name(&self) -> &str {
        &self.tt_name
    }

    pub fn start_coach(&self) -> Option<&str> {
        self.start_coach.as_deref()
    }

    pub fn rac_upgrade_fee_inr(&self) -> u64 {
        self.rac_upgrade_fee_inr
    }

    pub fn default_penalty_inr(&self) -> u64 {
        self.default_penalty_inr
    }

    pub fn blacklist(&self) -> &[BlacklistEntry] {
        &self.blacklist
    }

    pub fn report_every_events(&self) -> u64 {
        self.report_every_events
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method to pin the journey date
    pub fn with_journey_date(mut self, date: NaiveDate) -> Self {
        self.journey_date = date;
        self
    }

    /// Builder method to replace the route
    pub fn with_route(mut self, stations: &[&str], segment_end: &str) -> Self {
        self.stations = stations.iter().map(|s| s.to_string()).collect();
        self.segment_end = segment_end.to_string();
        self
    }

    /// Builder method to replace the blacklist
    pub fn with_blacklist(mut self, blacklist: Vec<BlacklistEntry>) -> Self {
        self.blacklist = blacklist;
        self
    }

    /// Builder method to set the starting coach
    pub fn with_start_coach(mut self, coach: &str) -> Self {
        self.start_coach = Some(coach.to_string());
        self
    }
}
