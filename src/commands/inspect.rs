use std::fs;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::InspectArgs;
use crate::commands::emit;
use crate::model::DetailInspection;
use crate::tabanow::{PlanPageParser, TabanowConfig, plan_contains_parcel};
use crate::util::required_identifier;

pub fn run(args: InspectArgs) -> Result<()> {
    let html = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let parcel = match (args.gush.as_deref(), args.helka.as_deref()) {
        (Some(gush), Some(helka)) => Some((
            required_identifier("gush", gush)?,
            required_identifier("helka", helka)?,
        )),
        (None, None) => None,
        _ => bail!("--gush and --helka must be given together"),
    };
    let base_url = TabanowConfig::from_raw(args.base_url.as_deref(), None, None, None).base_url;

    let inspection = inspect_page(&html, &base_url, parcel.as_ref())?;
    info!(
        file = %args.file.display(),
        parcel_rows = inspection.parcel_row_count,
        parcel_match = ?inspection.parcel_match,
        "plan page inspected"
    );

    emit(&inspection, args.output.as_deref())
}

pub(crate) fn inspect_page(
    html: &str,
    base_url: &str,
    parcel: Option<&(String, String)>,
) -> Result<DetailInspection> {
    let parser = PlanPageParser::new()?;
    let detail = parser.plan_detail(html, base_url);
    let parcel_match = parcel.map(|(gush, helka)| plan_contains_parcel(&detail, gush, helka));

    Ok(DetailInspection {
        takanon_url: detail.takanon_url.clone(),
        lot_size_sqm: detail.lot_size_sqm,
        max_floors: detail.max_floors,
        parcel_row_count: detail.parcel_rows.len(),
        blocks: detail.parcel_rows.iter().map(|row| row.gush.clone()).collect(),
        parcel_match,
    })
}
