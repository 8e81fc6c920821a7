use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use crate::cli::EnrichArgs;
use crate::commands::{emit, open_session};
use crate::model::PlanRecord;
use crate::scraper_api::{plans_from_payload, unwrap_payload};
use crate::util::required_identifier;

pub async fn run(args: EnrichArgs) -> Result<()> {
    let gush = required_identifier("gush", &args.parcel.gush)?;
    let helka = required_identifier("helka", &args.parcel.helka)?;
    let known = read_known_plans(&args.plans)?;
    let session = open_session(&args.tabanow, &args.events)?;

    let plans = session.client.enrich_plans(&known, &gush, &helka).await;
    info!(
        gush = %gush,
        helka = %helka,
        known_plans = known.len(),
        plans = plans.len(),
        "enrich finished"
    );

    emit(&plans, args.output.as_deref())
}

pub(crate) fn read_known_plans(path: &Path) -> Result<Vec<PlanRecord>> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let payload: Value = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(plans_from_payload(unwrap_payload(payload)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_known_plans_accepts_wrapped_payloads() {
        let path = std::env::temp_dir().join(format!("reguscape-known-plans-{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{"data": {"plans": [{"planNumber": "507-0123456", "planName": "x"}, {"status": "orphan"}]}}"#,
        )
        .unwrap();

        let plans = read_known_plans(&path).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].taba_code, "507-0123456");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn read_known_plans_reports_bad_json() {
        let path = std::env::temp_dir().join(format!("reguscape-bad-plans-{}.json", std::process::id()));
        fs::write(&path, "not json").unwrap();

        let err = read_known_plans(&path).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse"));

        fs::remove_file(&path).unwrap();
    }
}
