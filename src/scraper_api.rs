use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::ACCEPT;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::model::{BuildingRegulations, LandPlotIdentifiers, PlanRecord, SCRAPER_SOURCE};

pub const TABA_PLANS_SOURCE: &str = "scraper.get_taba_plans";
pub const DEFAULT_TABA_PATH: &str = "/get_taba_info";
pub const DEFAULT_LAND_PLOT_PATH: &str = "/get_land_plot_identifiers";
pub const DEFAULT_PARCEL_FROM_ADDRESS_PATH: &str = "/get_parcel_from_address";
pub const DEFAULT_ADDRESS_FROM_PARCEL_PATH: &str = "/get_address_from_parcel";
pub const DEFAULT_REGULATIONS_PATH: &str = "/get_building_regulations";
const API_KEY_HEADER: &str = "X-API-Key";
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("Scraper API returned {status}{}", body_suffix(.body))]
    Status { status: u16, body: String },
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Scraper API returned invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid scraper url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScraperPaths {
    pub taba: String,
    pub land_plot: String,
    pub parcel_from_address: String,
    pub address_from_parcel: String,
    pub regulations: String,
}

impl Default for ScraperPaths {
    fn default() -> Self {
        Self::from_raw(None, None, None, None, None)
    }
}

impl ScraperPaths {
    pub fn from_raw(
        taba: Option<&str>,
        land_plot: Option<&str>,
        parcel_from_address: Option<&str>,
        address_from_parcel: Option<&str>,
        regulations: Option<&str>,
    ) -> Self {
        let or_default = |value: Option<&str>, default: &str| {
            non_blank(value).unwrap_or_else(|| default.to_string())
        };
        Self {
            taba: or_default(taba, DEFAULT_TABA_PATH),
            land_plot: or_default(land_plot, DEFAULT_LAND_PLOT_PATH),
            parcel_from_address: or_default(parcel_from_address, DEFAULT_PARCEL_FROM_ADDRESS_PATH),
            address_from_parcel: or_default(address_from_parcel, DEFAULT_ADDRESS_FROM_PARCEL_PATH),
            regulations: or_default(regulations, DEFAULT_REGULATIONS_PATH),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    pub api_key: String,
    pub paths: ScraperPaths,
    pub request_timeout: Duration,
}

impl ScraperConfig {
    pub fn from_raw(
        base_url: Option<&str>,
        api_key: Option<&str>,
        paths: ScraperPaths,
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let base_url = non_blank(base_url).ok_or(ProviderError::NotConfigured("SCRAPER_API_BASE_URL"))?;
        let api_key = non_blank(api_key).ok_or(ProviderError::NotConfigured("SCRAPER_API_KEY"))?;
        parse_base_url(&base_url)?;
        Ok(Self {
            base_url,
            api_key,
            paths,
            request_timeout,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LandPlotQuery<'a> {
    pub coordinate_x: Option<f64>,
    pub coordinate_y: Option<f64>,
    pub land_plot_id: Option<&'a str>,
}

#[async_trait]
pub trait PlanSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn plans_for_parcel(&self, gush: &str, helka: &str) -> Result<Vec<PlanRecord>, ProviderError>;
}

#[async_trait]
pub trait ParcelDirectory: Send + Sync {
    async fn parcel_from_address(&self, address: &str) -> Result<LandPlotIdentifiers, ProviderError>;

    async fn address_from_parcel(&self, gush: &str, helka: &str) -> Result<LandPlotIdentifiers, ProviderError>;

    async fn land_plot_identifiers(&self, query: &LandPlotQuery<'_>) -> Result<LandPlotIdentifiers, ProviderError>;
}

pub struct ScraperApi {
    client: reqwest::Client,
    config: ScraperConfig,
}

impl ScraperApi {
    pub fn new(config: ScraperConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub async fn get_taba_plans(&self, gush: &str, helka: &str) -> Result<Vec<PlanRecord>, ProviderError> {
        let payload = self
            .request(&self.config.paths.taba, &[("gush", gush), ("helka", helka)])
            .await?;
        let plans = plans_from_payload(payload);
        info!(gush = %gush, helka = %helka, plans = plans.len(), "scraper plans loaded");
        Ok(plans)
    }

    pub async fn building_regulations(&self, gush: &str, helka: &str) -> Result<BuildingRegulations, ProviderError> {
        let payload = self
            .request(&self.config.paths.regulations, &[("gush", gush), ("helka", helka)])
            .await?;
        Ok(regulations_from_payload(&payload))
    }

    async fn request(&self, endpoint_path: &str, query: &[(&str, &str)]) -> Result<Value, ProviderError> {
        let url = build_endpoint_url(&self.config.base_url, endpoint_path, query)?;
        debug!(url = %url, "requesting scraper api");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: body.trim().chars().take(ERROR_BODY_PREVIEW_CHARS).collect(),
            });
        }

        let body = response.text().await?;
        let payload = serde_json::from_str::<Value>(&body)?;
        Ok(unwrap_payload(payload))
    }
}

#[async_trait]
impl PlanSource for ScraperApi {
    fn name(&self) -> &'static str {
        TABA_PLANS_SOURCE
    }

    async fn plans_for_parcel(&self, gush: &str, helka: &str) -> Result<Vec<PlanRecord>, ProviderError> {
        self.get_taba_plans(gush, helka).await
    }
}

#[async_trait]
impl ParcelDirectory for ScraperApi {
    async fn parcel_from_address(&self, address: &str) -> Result<LandPlotIdentifiers, ProviderError> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(LandPlotIdentifiers::default());
        }

        let payload = self
            .request(&self.config.paths.parcel_from_address, &[("address", address)])
            .await?;
        let identifiers = parcel_from_address_payload(&payload, address);
        info!(address = %address, gush = %identifiers.gush, helka = %identifiers.helka, "address resolved");
        Ok(identifiers)
    }

    async fn address_from_parcel(&self, gush: &str, helka: &str) -> Result<LandPlotIdentifiers, ProviderError> {
        let (gush, helka) = (gush.trim(), helka.trim());
        if gush.is_empty() || helka.is_empty() {
            return Ok(LandPlotIdentifiers::default());
        }

        let payload = self
            .request(&self.config.paths.address_from_parcel, &[("gush", gush), ("helka", helka)])
            .await?;
        Ok(address_from_parcel_payload(&payload, gush, helka))
    }

    async fn land_plot_identifiers(&self, query: &LandPlotQuery<'_>) -> Result<LandPlotIdentifiers, ProviderError> {
        let coordinate_x = query.coordinate_x.map(|value| value.to_string()).unwrap_or_default();
        let coordinate_y = query.coordinate_y.map(|value| value.to_string()).unwrap_or_default();
        let payload = self
            .request(
                &self.config.paths.land_plot,
                &[
                    ("coordinate_x", coordinate_x.as_str()),
                    ("coordinate_y", coordinate_y.as_str()),
                    ("land_plot_id", query.land_plot_id.unwrap_or_default()),
                ],
            )
            .await?;
        Ok(land_plot_from_payload(&payload))
    }
}

fn parse_base_url(base_url: &str) -> Result<Url, ProviderError> {
    Url::parse(base_url).map_err(|err| ProviderError::InvalidUrl {
        url: base_url.to_string(),
        reason: err.to_string(),
    })
}

pub fn build_endpoint_url(
    base_url: &str,
    endpoint_path: &str,
    query: &[(&str, &str)],
) -> Result<Url, ProviderError> {
    let mut url = parse_base_url(base_url)?;
    let endpoint_path = if endpoint_path.starts_with('/') {
        endpoint_path.to_string()
    } else {
        format!("/{endpoint_path}")
    };
    let joined = format!("{}{}", url.path().trim_end_matches('/'), endpoint_path);
    url.set_path(&collapse_slashes(&joined));

    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query.iter().filter(|(_, value)| !value.is_empty()) {
            pairs.append_pair(key, value);
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }
    Ok(url)
}

fn collapse_slashes(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    for ch in path.chars() {
        if ch == '/' && collapsed.ends_with('/') {
            continue;
        }
        collapsed.push(ch);
    }
    collapsed
}

pub fn unwrap_payload(payload: Value) -> Value {
    match payload {
        Value::Object(mut record) => {
            if let Some(data) = record.remove("data").filter(|value| !value.is_null()) {
                return data;
            }
            if let Some(result) = record.remove("result").filter(|value| !value.is_null()) {
                return result;
            }
            Value::Object(record)
        }
        other => other,
    }
}

// Repeated code|description keys keep their first position and the last value.
pub fn plans_from_payload(payload: Value) -> Vec<PlanRecord> {
    let candidates = match payload {
        Value::Array(items) => items,
        Value::Object(mut record) => match record.remove("plans") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                record.insert("plans".to_string(), other);
                vec![Value::Object(record)]
            }
            None if record.is_empty() => Vec::new(),
            None => vec![Value::Object(record)],
        },
        _ => Vec::new(),
    };

    let mut plans = Vec::<PlanRecord>::new();
    let mut positions = HashMap::<String, usize>::new();
    for candidate in &candidates {
        let Some(plan) = normalize_plan_value(candidate) else {
            continue;
        };
        let key = format!("{}|{}", plan.taba_code, plan.taba_description);
        match positions.get(&key) {
            Some(&index) => plans[index] = plan,
            None => {
                positions.insert(key, plans.len());
                plans.push(plan);
            }
        }
    }

    plans
}

pub fn normalize_plan_value(value: &Value) -> Option<PlanRecord> {
    let record = value.as_object()?;
    let taba_code = first_string(record, &["taba_code", "tabaCode", "plan_number", "planNumber", "code"]);
    let taba_description = first_string(
        record,
        &["taba_description", "tabaDescription", "plan_name", "planName", "description"],
    );
    if taba_code.is_empty() && taba_description.is_empty() {
        return None;
    }

    let source = first_string(record, &["source"]);
    Some(PlanRecord {
        taba_code,
        taba_description,
        plan_status: optional_string(record, &["plan_status", "planStatus", "status"]),
        locality: optional_string(record, &["locality", "city"]),
        place: optional_string(record, &["place", "plan_place", "planPlace"]),
        takanon_url: optional_string(record, &["takanon_url", "takanonUrl"]),
        plan_page_url: optional_string(record, &["plan_page_url", "planPageUrl"]),
        lot_size_sqm: first_number(record, &["lot_size_sqm", "lotSizeSqm"]),
        max_floors: floors_value(record),
        max_buildable_area_sqm: first_number(record, &["max_buildable_area_sqm", "maxBuildableAreaSqm"]),
        source: Some(if source.is_empty() {
            SCRAPER_SOURCE.to_string()
        } else {
            source
        }),
    })
}

pub fn land_plot_from_payload(payload: &Value) -> LandPlotIdentifiers {
    let Some(record) = payload.as_object() else {
        return LandPlotIdentifiers::default();
    };
    LandPlotIdentifiers {
        gush: first_string(record, &["gush"]),
        helka: first_string(record, &["helka"]),
        addresses: collect_addresses(record, false),
    }
}

// An address that resolves to bare identifiers keeps the query as its label.
pub fn parcel_from_address_payload(payload: &Value, address: &str) -> LandPlotIdentifiers {
    let empty = Map::new();
    let record = payload.as_object().unwrap_or(&empty);
    let mut addresses = collect_addresses(record, true);
    if addresses.is_empty() {
        addresses.push(address.to_string());
    }
    LandPlotIdentifiers {
        gush: first_string(record, &["gush"]),
        helka: first_string(record, &["helka"]),
        addresses,
    }
}

pub fn address_from_parcel_payload(payload: &Value, gush: &str, helka: &str) -> LandPlotIdentifiers {
    let addresses = payload
        .as_object()
        .map(|record| collect_addresses(record, true))
        .unwrap_or_default();
    LandPlotIdentifiers {
        gush: gush.to_string(),
        helka: helka.to_string(),
        addresses,
    }
}

pub fn regulations_from_payload(payload: &Value) -> BuildingRegulations {
    let Some(record) = payload.as_object() else {
        return BuildingRegulations::default();
    };
    BuildingRegulations {
        max_floors: floors_value(record),
        max_buildable_area_sqm: first_number(record, &["max_buildable_area_sqm", "maxBuildableAreaSqm"]),
        govmap_url: String::new(),
    }
}

// `address` goes first, `description` last; duplicates are dropped.
fn collect_addresses(record: &Map<String, Value>, with_description: bool) -> Vec<String> {
    let mut addresses = Vec::<String>::new();
    if let Some(Value::Array(items)) = record.get("addresses") {
        for item in items {
            let text = scalar_string(item);
            if !text.is_empty() && !addresses.contains(&text) {
                addresses.push(text);
            }
        }
    }

    let single = first_string(record, &["address"]);
    if !single.is_empty() && !addresses.contains(&single) {
        addresses.insert(0, single);
    }
    if with_description {
        let description = first_string(record, &["description"]);
        if !description.is_empty() && !addresses.contains(&description) {
            addresses.push(description);
        }
    }
    addresses
}

fn floors_value(record: &Map<String, Value>) -> Option<u32> {
    first_number(record, &["max_floors", "maxFloors"])
        .filter(|value| *value >= 1.0 && *value <= f64::from(u32::MAX))
        .map(|value| value.floor() as u32)
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    }
}

fn first_value<'v>(record: &'v Map<String, Value>, keys: &[&str]) -> Option<&'v Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
}

fn first_string(record: &Map<String, Value>, keys: &[&str]) -> String {
    first_value(record, keys).map(scalar_string).unwrap_or_default()
}

fn optional_string(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    Some(first_string(record, keys)).filter(|value| !value.is_empty())
}

// Positive finite numbers only; numeric strings are accepted.
fn first_number(record: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    let parsed = match first_value(record, keys)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    Some(parsed).filter(|value| value.is_finite() && *value > 0.0)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
