use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::events::DEFAULT_EVENT_CAPACITY;
use crate::model::EventStatus;
use crate::scraper_api::{ProviderError, ScraperConfig, ScraperPaths};
use crate::tabanow::TabanowConfig;

#[derive(Parser, Debug)]
#[command(
    name = "reguscape",
    version,
    about = "Planning-plan lookup for Israeli block/parcel identifiers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find plans covering a parcel by scanning the block's search results.
    Discover(DiscoverArgs),
    /// Fill missing fields of known plans from their detail pages.
    Enrich(EnrichArgs),
    /// Scraper plans plus Tabanow enrichment or discovery, merged.
    Lookup(LookupArgs),
    /// Resolve an address, parcel, plot id or coordinates to land-plot identifiers.
    Parcel(ParcelQueryArgs),
    /// Building regulations for a parcel from the scraper api.
    Regulations(RegulationsArgs),
    /// Parse a saved plan-detail page offline.
    Inspect(InspectArgs),
    /// List or clear recorded lookup events.
    Events(EventsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ParcelArgs {
    #[arg(long)]
    pub gush: String,

    #[arg(long)]
    pub helka: String,
}

#[derive(Args, Debug, Clone)]
pub struct TabanowArgs {
    #[arg(long = "tabanow-base-url", env = "TABANOW_BASE_URL")]
    pub base_url: Option<String>,

    #[arg(long, env = "TABANOW_MAX_BLOCK_PAGES")]
    pub max_block_pages: Option<String>,

    #[arg(long, env = "TABANOW_MAX_PLAN_DETAILS")]
    pub max_plan_details: Option<String>,

    #[arg(long = "request-timeout-ms", env = "TABANOW_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<String>,
}

impl TabanowArgs {
    pub fn to_config(&self) -> TabanowConfig {
        TabanowConfig::from_raw(
            self.base_url.as_deref(),
            self.max_block_pages.as_deref(),
            self.max_plan_details.as_deref(),
            self.request_timeout_ms.as_deref(),
        )
    }
}

#[derive(Args, Debug, Clone)]
pub struct EventArgs {
    #[arg(long = "event-log", env = "REGUSCAPE_EVENT_LOG")]
    pub event_log: Option<PathBuf>,

    #[arg(long, env = "REGUSCAPE_EVENT_CAPACITY", default_value_t = DEFAULT_EVENT_CAPACITY)]
    pub event_capacity: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ScraperArgs {
    #[arg(long = "scraper-base-url", env = "SCRAPER_API_BASE_URL")]
    pub scraper_base_url: Option<String>,

    #[arg(long = "scraper-api-key", env = "SCRAPER_API_KEY", hide_env_values = true)]
    pub scraper_api_key: Option<String>,

    #[arg(long = "scraper-taba-path", env = "SCRAPER_TABA_PATH")]
    pub scraper_taba_path: Option<String>,

    #[arg(long = "scraper-land-plot-path", env = "SCRAPER_LAND_PLOT_PATH")]
    pub scraper_land_plot_path: Option<String>,

    #[arg(long = "scraper-parcel-from-address-path", env = "SCRAPER_PARCEL_FROM_ADDRESS_PATH")]
    pub scraper_parcel_from_address_path: Option<String>,

    #[arg(long = "scraper-address-from-parcel-path", env = "SCRAPER_ADDRESS_FROM_PARCEL_PATH")]
    pub scraper_address_from_parcel_path: Option<String>,

    #[arg(long = "scraper-regulations-path", env = "SCRAPER_REGULATIONS_PATH")]
    pub scraper_regulations_path: Option<String>,
}

impl ScraperArgs {
    pub fn to_config(&self, request_timeout: Duration) -> Result<ScraperConfig, ProviderError> {
        let paths = ScraperPaths::from_raw(
            self.scraper_taba_path.as_deref(),
            self.scraper_land_plot_path.as_deref(),
            self.scraper_parcel_from_address_path.as_deref(),
            self.scraper_address_from_parcel_path.as_deref(),
            self.scraper_regulations_path.as_deref(),
        );
        ScraperConfig::from_raw(
            self.scraper_base_url.as_deref(),
            self.scraper_api_key.as_deref(),
            paths,
            request_timeout,
        )
    }
}

#[derive(Args, Debug, Clone)]
pub struct TimeoutArgs {
    #[arg(long = "request-timeout-ms", env = "TABANOW_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<String>,
}

impl TimeoutArgs {
    pub fn request_timeout(&self) -> Duration {
        TabanowConfig::from_raw(None, None, None, self.request_timeout_ms.as_deref()).request_timeout
    }
}

#[derive(Args, Debug, Clone)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub parcel: ParcelArgs,

    #[command(flatten)]
    pub tabanow: TabanowArgs,

    #[command(flatten)]
    pub events: EventArgs,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct EnrichArgs {
    #[command(flatten)]
    pub parcel: ParcelArgs,

    #[arg(long)]
    pub plans: PathBuf,

    #[command(flatten)]
    pub tabanow: TabanowArgs,

    #[command(flatten)]
    pub events: EventArgs,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = true)]
pub struct LookupTargetArgs {
    /// Street address, resolved to gush/helka before the lookup.
    #[arg(long, conflicts_with_all = ["gush", "helka"])]
    pub address: Option<String>,

    #[arg(long, requires = "helka")]
    pub gush: Option<String>,

    #[arg(long, requires = "gush")]
    pub helka: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct LookupArgs {
    #[command(flatten)]
    pub target: LookupTargetArgs,

    #[command(flatten)]
    pub tabanow: TabanowArgs,

    #[command(flatten)]
    pub scraper: ScraperArgs,

    #[command(flatten)]
    pub events: EventArgs,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = true)]
pub struct ParcelTargetArgs {
    #[arg(long)]
    pub address: Option<String>,

    #[arg(long, requires = "helka")]
    pub gush: Option<String>,

    #[arg(long, requires = "gush")]
    pub helka: Option<String>,

    #[arg(long = "land-plot-id")]
    pub land_plot_id: Option<String>,

    #[arg(long = "coordinate-x", requires = "coordinate_y", allow_negative_numbers = true)]
    pub coordinate_x: Option<f64>,

    #[arg(long = "coordinate-y", requires = "coordinate_x", allow_negative_numbers = true)]
    pub coordinate_y: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct ParcelQueryArgs {
    #[command(flatten)]
    pub target: ParcelTargetArgs,

    #[command(flatten)]
    pub scraper: ScraperArgs,

    #[command(flatten)]
    pub timeout: TimeoutArgs,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RegulationsArgs {
    #[command(flatten)]
    pub parcel: ParcelArgs,

    #[command(flatten)]
    pub scraper: ScraperArgs,

    #[command(flatten)]
    pub timeout: TimeoutArgs,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[arg(long)]
    pub file: PathBuf,

    #[arg(long)]
    pub gush: Option<String>,

    #[arg(long)]
    pub helka: Option<String>,

    #[arg(long = "tabanow-base-url", env = "TABANOW_BASE_URL")]
    pub base_url: Option<String>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum EventStatusArg {
    Success,
    Error,
    Pending,
}

impl From<EventStatusArg> for EventStatus {
    fn from(value: EventStatusArg) -> Self {
        match value {
            EventStatusArg::Success => Self::Success,
            EventStatusArg::Error => Self::Error,
            EventStatusArg::Pending => Self::Pending,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct EventsArgs {
    #[arg(long = "event-log", env = "REGUSCAPE_EVENT_LOG")]
    pub event_log: PathBuf,

    #[arg(long, env = "REGUSCAPE_EVENT_CAPACITY", default_value_t = DEFAULT_EVENT_CAPACITY)]
    pub event_capacity: usize,

    #[arg(long)]
    pub action: Option<String>,

    #[arg(long, value_enum)]
    pub status: Option<EventStatusArg>,

    #[arg(long, default_value_t = false)]
    pub clear: bool,
}
