use anyhow::Result;
use tracing::info;

use crate::cli::RegulationsArgs;
use crate::commands::{emit, open_scraper};
use crate::links::govmap_taba_url;
use crate::model::BuildingRegulations;
use crate::util::required_identifier;

pub async fn run(args: RegulationsArgs) -> Result<()> {
    let gush = required_identifier("gush", &args.parcel.gush)?;
    let helka = required_identifier("helka", &args.parcel.helka)?;
    let scraper = open_scraper(&args.scraper, args.timeout.request_timeout())?;

    let regulations = match scraper {
        Some(api) => api.building_regulations(&gush, &helka).await?,
        None => BuildingRegulations::default(),
    };
    let regulations = with_govmap_link(regulations, &gush, &helka);
    info!(
        gush = %gush,
        helka = %helka,
        max_floors = ?regulations.max_floors,
        max_buildable_area_sqm = ?regulations.max_buildable_area_sqm,
        "building regulations resolved"
    );
    emit(&regulations, args.output.as_deref())
}

fn with_govmap_link(regulations: BuildingRegulations, gush: &str, helka: &str) -> BuildingRegulations {
    BuildingRegulations {
        govmap_url: govmap_taba_url(gush, helka),
        ..regulations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn govmap_link_is_added_without_touching_values() {
        let regulations = with_govmap_link(
            BuildingRegulations {
                max_floors: Some(6),
                max_buildable_area_sqm: Some(412.5),
                govmap_url: String::new(),
            },
            "6166",
            "35",
        );
        assert_eq!(regulations.max_floors, Some(6));
        assert_eq!(regulations.max_buildable_area_sqm, Some(412.5));
        assert_eq!(
            regulations.govmap_url,
            "https://www.govmap.gov.il/?lay=TABA_MSBS_ITM&lot=6166&parcel=35"
        );
    }

    #[test]
    fn unconfigured_regulations_serialize_as_nulls_with_link() {
        let regulations = with_govmap_link(BuildingRegulations::default(), "1", "2");
        let value = serde_json::to_value(&regulations).unwrap();
        assert!(value["max_floors"].is_null());
        assert!(value["max_buildable_area_sqm"].is_null());
        assert!(value["govmap_url"].as_str().unwrap().ends_with("lot=1&parcel=2"));
    }
}
