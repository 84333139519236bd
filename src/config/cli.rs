use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::application::beacon::TransportStyle;

pub(super) const DEFAULT_LANGUAGE: &str = "en-US";

/// Command-line arguments for the beacon binary.
#[derive(Debug, Parser)]
#[command(
    name = "pageview-beacon",
    version,
    about = "Fire page-view beacons for rendered blog pages"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PAGEVIEW_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Signal DOM-ready for a page and send its beacon.
    Fire(PageArgs),
    /// Print the beacon URL a page would produce without sending it.
    Preview(PageArgs),
}

impl Command {
    pub fn page_args(&self) -> &PageArgs {
        match self {
            Command::Fire(args) | Command::Preview(args) => args,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct PageArgs {
    #[command(flatten)]
    pub page: PageInput,

    #[command(flatten)]
    pub overrides: BeaconOverrides,
}

/// The browsing context a page load would expose.
#[derive(Debug, Args, Clone, Default)]
pub struct PageInput {
    /// Rendered HTML page to read the title element from.
    #[arg(long = "page", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub page: Option<PathBuf>,

    /// Use this title instead of reading one from the page.
    #[arg(long = "title", value_name = "TEXT")]
    pub title: Option<String>,

    /// Address of the referring page; empty for direct navigation.
    #[arg(long = "referrer", value_name = "URL", default_value = "")]
    pub referrer: String,

    /// Browser identification string.
    #[arg(long = "user-agent", value_name = "AGENT", default_value = "")]
    pub user_agent: String,

    /// Preferred language tag.
    #[arg(long = "language", value_name = "TAG", default_value = DEFAULT_LANGUAGE)]
    pub language: String,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BeaconOverrides {
    /// Override the collector endpoint.
    #[arg(long = "endpoint", value_name = "URL")]
    pub endpoint: Option<String>,

    /// Override the site identifier.
    #[arg(long = "site", value_name = "ID")]
    pub site: Option<String>,

    /// Override the CSS selector of the title element.
    #[arg(long = "title-selector", value_name = "SELECTOR")]
    pub title_selector: Option<String>,

    /// Replace the bot markers; repeat for several.
    #[arg(long = "bot-marker", value_name = "MARKER")]
    pub bot_markers: Vec<String>,

    /// Override the transport style (cors|jsonp).
    #[arg(long = "transport", value_name = "STYLE")]
    pub transport: Option<TransportStyle>,

    /// Override the JSONP callback query parameter name.
    #[arg(long = "callback-param", value_name = "NAME")]
    pub callback_param: Option<String>,

    /// Bound the request duration.
    #[arg(long = "timeout-seconds", value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}
