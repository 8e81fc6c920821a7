use serde::{Deserialize, Serialize};

use crate::util::now_utc_string;

pub const TABANOW_SOURCE: &str = "tabanow";
pub const SCRAPER_SOURCE: &str = "scraper";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    #[serde(default)]
    pub taba_code: String,
    #[serde(default)]
    pub taba_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub takanon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_size_sqm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_floors: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_buildable_area_sqm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl PlanRecord {
    pub fn code_or_description(&self) -> &str {
        if self.taba_code.is_empty() {
            &self.taba_description
        } else {
            &self.taba_code
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExternalLinks {
    pub govmap_taba_url: String,
    pub govmap_parcel_url: String,
    pub iplan_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LandPlotIdentifiers {
    pub gush: String,
    pub helka: String,
    pub addresses: Vec<String>,
}

impl LandPlotIdentifiers {
    pub fn is_resolved(&self) -> bool {
        !self.gush.trim().is_empty() && !self.helka.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildingRegulations {
    pub max_floors: Option<u32>,
    pub max_buildable_area_sqm: Option<f64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub govmap_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TabaPlansResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub land_plot: Option<LandPlotIdentifiers>,
    pub plans: Vec<PlanRecord>,
    #[serde(flatten)]
    pub links: ExternalLinks,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailInspection {
    pub takanon_url: Option<String>,
    pub lot_size_sqm: Option<f64>,
    pub max_floors: Option<u32>,
    pub parcel_row_count: usize,
    pub blocks: Vec<String>,
    pub parcel_match: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Success,
    Error,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupEvent {
    #[serde(default)]
    pub id: String,
    pub timestamp: String,
    pub action: String,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
    pub status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl LookupEvent {
    pub fn new(
        action: &str,
        input: serde_json::Value,
        output: serde_json::Value,
        status: EventStatus,
    ) -> Self {
        Self {
            id: String::new(),
            timestamp: now_utc_string(),
            action: action.to_string(),
            input,
            output,
            status,
            error: None,
            duration_ms: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_duration(mut self, duration: std::time::Duration) -> Self {
        self.duration_ms = Some(duration.as_millis() as u64);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventListing {
    pub count: usize,
    pub events: Vec<LookupEvent>,
}
