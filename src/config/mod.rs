//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::{
    application::{
        beacon::{BeaconConfig, DEFAULT_CALLBACK_PARAM, TransportStyle},
        page::TitleSelector,
    },
    domain::{
        bot::{BotHeuristic, DEFAULT_BOT_MARKERS},
        event::{EVENT_PARAMS, SiteId},
    },
};

mod cli;

pub use cli::{BeaconOverrides, CliArgs, Command, PageArgs, PageInput};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "pageview-beacon";
const ENV_PREFIX: &str = "PAGEVIEW";
const DEFAULT_SITE: &str = "blog";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub beacon: BeaconSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct BeaconSettings {
    pub endpoint: Url,
    pub site: SiteId,
    pub title_selector: TitleSelector,
    pub bots: BotHeuristic,
    pub transport: TransportStyle,
    pub callback_param: String,
    pub timeout: Option<Duration>,
}

impl BeaconSettings {
    pub fn beacon_config(&self) -> BeaconConfig {
        BeaconConfig {
            endpoint: self.endpoint.clone(),
            site: self.site.clone(),
            bots: self.bots.clone(),
            style: self.transport,
            callback_param: self.callback_param.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    load_from(cli.config_file.as_ref(), &cli.command.page_args().overrides)
}

fn load_from(
    config_file: Option<&PathBuf>,
    overrides: &BeaconOverrides,
) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("beacon.bot_markers")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    beacon: RawBeaconSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &BeaconOverrides) {
        if let Some(endpoint) = overrides.endpoint.as_ref() {
            self.beacon.endpoint = Some(endpoint.clone());
        }
        if let Some(site) = overrides.site.as_ref() {
            self.beacon.site = Some(site.clone());
        }
        if let Some(selector) = overrides.title_selector.as_ref() {
            self.beacon.title_selector = Some(selector.clone());
        }
        if !overrides.bot_markers.is_empty() {
            self.beacon.bot_markers = Some(overrides.bot_markers.clone());
        }
        if let Some(transport) = overrides.transport {
            self.beacon.transport = Some(transport.as_str().to_string());
        }
        if let Some(param) = overrides.callback_param.as_ref() {
            self.beacon.callback_param = Some(param.clone());
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.beacon.timeout_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings { logging, beacon } = raw;

        let logging = build_logging_settings(logging)?;
        let beacon = build_beacon_settings(beacon)?;

        Ok(Self { logging, beacon })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_beacon_settings(beacon: RawBeaconSettings) -> Result<BeaconSettings, LoadError> {
    let endpoint = beacon
        .endpoint
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| LoadError::invalid("beacon.endpoint", "a collector URL is required"))?;
    let endpoint = parse_endpoint(endpoint)?;

    let site = SiteId::parse(beacon.site.as_deref().unwrap_or(DEFAULT_SITE))
        .map_err(|err| LoadError::invalid("beacon.site", err.to_string()))?;

    let title_selector = match beacon.title_selector.as_deref() {
        Some(value) => TitleSelector::parse(value).map_err(|err| {
            LoadError::invalid("beacon.title_selector", format!("`{value}`: {err}"))
        })?,
        None => TitleSelector::default(),
    };

    let bots = match beacon.bot_markers {
        Some(markers) => BotHeuristic::new(markers),
        None => BotHeuristic::new(DEFAULT_BOT_MARKERS),
    };

    let transport = match beacon.transport.as_deref() {
        Some(value) => TransportStyle::from_str(value)
            .map_err(|reason| LoadError::invalid("beacon.transport", reason))?,
        None => TransportStyle::default(),
    };

    let callback_param = beacon
        .callback_param
        .unwrap_or_else(|| DEFAULT_CALLBACK_PARAM.to_string());
    let callback_param = callback_param.trim().to_string();
    if callback_param.is_empty() || callback_param.chars().any(char::is_whitespace) {
        return Err(LoadError::invalid(
            "beacon.callback_param",
            "must be a non-empty name without whitespace",
        ));
    }
    if EVENT_PARAMS.contains(&callback_param.as_str()) {
        return Err(LoadError::invalid(
            "beacon.callback_param",
            format!("`{callback_param}` is already a tracking parameter"),
        ));
    }

    let timeout = match beacon.timeout_seconds {
        Some(0) => {
            return Err(LoadError::invalid(
                "beacon.timeout_seconds",
                "must be greater than zero",
            ));
        }
        Some(seconds) => Some(Duration::from_secs(seconds)),
        None => None,
    };

    Ok(BeaconSettings {
        endpoint,
        site,
        title_selector,
        bots,
        transport,
        callback_param,
        timeout,
    })
}

fn parse_endpoint(value: &str) -> Result<Url, LoadError> {
    let url = Url::parse(value)
        .map_err(|err| LoadError::invalid("beacon.endpoint", format!("`{value}`: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "beacon.endpoint",
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }
    Ok(url)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBeaconSettings {
    endpoint: Option<String>,
    site: Option<String>,
    title_selector: Option<String>,
    bot_markers: Option<Vec<String>>,
    transport: Option<String>,
    callback_param: Option<String>,
    timeout_seconds: Option<u64>,
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
