use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.tabanow.co.il";
// "/תבע/חיפוש"
pub const SEARCH_PATH: &str = "/%D7%AA%D7%91%D7%A2/%D7%97%D7%99%D7%A4%D7%95%D7%A9";

pub const DEFAULT_MAX_BLOCK_PAGES: u64 = 8;
pub const MAX_BLOCK_PAGES_CEILING: u64 = 20;
pub const DEFAULT_MAX_PLAN_DETAILS: u64 = 80;
pub const MAX_PLAN_DETAILS_CEILING: u64 = 200;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 12_000;
pub const REQUEST_TIMEOUT_CEILING_MS: u64 = 60_000;

pub const MAX_FLOORS_CEILING: u32 = 80;
pub const MAX_LOT_SIZE_SQM: f64 = 1_000_000.0;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRow {
    pub locality: String,
    pub plan_number: String,
    pub status: String,
    pub description: String,
    pub place: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcelRow {
    pub gush: String,
    pub helka_tokens: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanDetail {
    pub takanon_url: Option<String>,
    pub lot_size_sqm: Option<f64>,
    pub max_floors: Option<u32>,
    pub parcel_rows: Vec<ParcelRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabanowConfig {
    pub base_url: String,
    pub max_block_pages: usize,
    pub max_plan_details: usize,
    pub request_timeout: Duration,
}

impl Default for TabanowConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_block_pages: DEFAULT_MAX_BLOCK_PAGES as usize,
            max_plan_details: DEFAULT_MAX_PLAN_DETAILS as usize,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

impl TabanowConfig {
    pub fn from_raw(
        base_url: Option<&str>,
        max_block_pages: Option<&str>,
        max_plan_details: Option<&str>,
        request_timeout_ms: Option<&str>,
    ) -> Self {
        let base_url = base_url
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_BASE_URL);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            max_block_pages: positive_or_default(
                max_block_pages,
                DEFAULT_MAX_BLOCK_PAGES,
                MAX_BLOCK_PAGES_CEILING,
            ) as usize,
            max_plan_details: positive_or_default(
                max_plan_details,
                DEFAULT_MAX_PLAN_DETAILS,
                MAX_PLAN_DETAILS_CEILING,
            ) as usize,
            request_timeout: Duration::from_millis(positive_or_default(
                request_timeout_ms,
                DEFAULT_REQUEST_TIMEOUT_MS,
                REQUEST_TIMEOUT_CEILING_MS,
            )),
        }
    }
}

pub fn positive_or_default(raw: Option<&str>, default_value: u64, ceiling: u64) -> u64 {
    let Some(parsed) = raw.and_then(|value| value.trim().parse::<f64>().ok()) else {
        return default_value;
    };
    if !parsed.is_finite() || parsed < 1.0 {
        return default_value;
    }

    (parsed.floor() as u64).min(ceiling)
}
