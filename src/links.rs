use reqwest::Url;

use crate::model::ExternalLinks;

const GOVMAP_BASE_URL: &str = "https://www.govmap.gov.il/";
const IPLAN_SEARCH_URL: &str = "https://iplan.gov.il/plansearch";
const GOVMAP_TABA_LAYER: &str = "TABA_MSBS_ITM";
const GOVMAP_PARCEL_LAYER: &str = "PARCEL_ALL";

pub fn govmap_taba_url(gush: &str, helka: &str) -> String {
    govmap_layer_url(GOVMAP_TABA_LAYER, gush, helka)
}

pub fn govmap_parcel_url(gush: &str, helka: &str) -> String {
    govmap_layer_url(GOVMAP_PARCEL_LAYER, gush, helka)
}

pub fn iplan_url(gush: &str, helka: &str) -> String {
    with_query(IPLAN_SEARCH_URL, &[("gush", gush), ("helka", helka)])
}

pub fn external_links(gush: &str, helka: &str) -> ExternalLinks {
    ExternalLinks {
        govmap_taba_url: govmap_taba_url(gush, helka),
        govmap_parcel_url: govmap_parcel_url(gush, helka),
        iplan_url: iplan_url(gush, helka),
    }
}

fn govmap_layer_url(layer: &str, gush: &str, helka: &str) -> String {
    with_query(
        GOVMAP_BASE_URL,
        &[("lay", layer), ("lot", gush), ("parcel", helka)],
    )
}

fn with_query(base: &str, params: &[(&str, &str)]) -> String {
    match Url::parse_with_params(base, params) {
        Ok(url) => url.to_string(),
        Err(_) => base.to_string(),
    }
}
