use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use serde_json::json;
use tracing::{info, warn};

use crate::cli::{LookupArgs, LookupTargetArgs, ScraperArgs};
use crate::commands::parcel::{ParcelQuery, resolve_parcel};
use crate::commands::{emit, open_scraper, open_session};
use crate::events::{EventSink, MemoryEventLog};
use crate::links::external_links;
use crate::model::{EventStatus, LandPlotIdentifiers, LookupEvent, PlanRecord, TabaPlansResponse};
use crate::scraper_api::{ParcelDirectory, PlanSource, ScraperApi, TABA_PLANS_SOURCE};
use crate::tabanow::{TabanowClient, merge_plan_lists};
use crate::util::required_identifier;

const LOOKUP_ACTION: &str = "lookup.taba_info";

pub async fn run(args: LookupArgs) -> Result<()> {
    let session = open_session(&args.tabanow, &args.events)?;
    let mut warnings = Vec::new();
    let scraper = scraper_plan_source(
        &args.scraper,
        session.client.config().request_timeout,
        &mut warnings,
    );

    let land_plot = match args.target.address.as_deref() {
        Some(address) => Some(resolve_address(scraper.as_ref(), address, &warnings).await?),
        None => None,
    };
    let (gush, helka) = lookup_parcel(&args.target, land_plot.as_ref())?;
    let source = scraper.as_ref().map(|api| api as &dyn PlanSource);

    let mut response =
        resolve_taba_plans(&session.client, &session.events, source, &gush, &helka, warnings).await;
    response.land_plot = land_plot;
    emit(&response, args.output.as_deref())
}

/// Setup failures other than a missing configuration become response warnings.
fn scraper_plan_source(
    args: &ScraperArgs,
    request_timeout: Duration,
    warnings: &mut Vec<String>,
) -> Option<ScraperApi> {
    match open_scraper(args, request_timeout) {
        Ok(api) => api,
        Err(err) => {
            warn!(error = %err, "scraper api unavailable, skipping");
            warnings.push(format!("{TABA_PLANS_SOURCE}: {err}"));
            None
        }
    }
}

async fn resolve_address(
    scraper: Option<&ScraperApi>,
    address: &str,
    warnings: &[String],
) -> Result<LandPlotIdentifiers> {
    let address = required_identifier("address", address)?;
    let Some(api) = scraper else {
        match warnings.first() {
            Some(warning) => bail!("cannot resolve address {address:?}: {warning}"),
            None => bail!("cannot resolve address {address:?}: the scraper api is not configured"),
        }
    };

    let land_plot = resolve_parcel(
        Some(api as &dyn ParcelDirectory),
        &ParcelQuery::Address(address.clone()),
    )
    .await?;
    if !land_plot.is_resolved() {
        bail!("address {address:?} did not resolve to a gush/helka");
    }
    info!(address = %address, gush = %land_plot.gush, helka = %land_plot.helka, "lookup address resolved");
    Ok(land_plot)
}

fn lookup_parcel(target: &LookupTargetArgs, land_plot: Option<&LandPlotIdentifiers>) -> Result<(String, String)> {
    let (gush, helka) = match land_plot {
        Some(land_plot) => (land_plot.gush.as_str(), land_plot.helka.as_str()),
        None => (
            target.gush.as_deref().unwrap_or_default(),
            target.helka.as_deref().unwrap_or_default(),
        ),
    };
    Ok((
        required_identifier("gush", gush)?,
        required_identifier("helka", helka)?,
    ))
}

pub(crate) async fn resolve_taba_plans(
    client: &TabanowClient,
    events: &MemoryEventLog,
    source: Option<&dyn PlanSource>,
    gush: &str,
    helka: &str,
    mut warnings: Vec<String>,
) -> TabaPlansResponse {
    let started = Instant::now();
    let input = json!({ "gush": gush, "helka": helka });

    let upstream = match source {
        Some(source) => fetch_upstream(source, events, gush, helka, &mut warnings).await,
        None => Vec::new(),
    };

    let tabanow = if upstream.is_empty() {
        client.find_plans_by_parcel(gush, helka).await
    } else {
        client.enrich_plans(&upstream, gush, helka).await
    };

    warnings.extend(
        events
            .by_status(EventStatus::Error)
            .into_iter()
            .filter(|event| event.action.starts_with("tabanow."))
            .map(|event| format!("{}: {}", event.action, event.error.unwrap_or_default())),
    );

    let upstream_count = upstream.len();
    let tabanow_count = tabanow.len();
    let plans = merge_plan_lists(upstream, tabanow);

    info!(
        gush = %gush,
        helka = %helka,
        upstream_plans = upstream_count,
        tabanow_plans = tabanow_count,
        plans = plans.len(),
        warnings = warnings.len(),
        "taba lookup complete"
    );
    events.record(
        LookupEvent::new(
            LOOKUP_ACTION,
            input,
            json!({
                "plans": plans.len(),
                "upstream_plans": upstream_count,
                "tabanow_plans": tabanow_count,
                "warnings": warnings,
            }),
            EventStatus::Success,
        )
        .with_duration(started.elapsed()),
    );

    TabaPlansResponse {
        land_plot: None,
        plans,
        links: external_links(gush, helka),
        warnings,
    }
}

async fn fetch_upstream(
    source: &dyn PlanSource,
    events: &MemoryEventLog,
    gush: &str,
    helka: &str,
    warnings: &mut Vec<String>,
) -> Vec<PlanRecord> {
    let started = Instant::now();
    let input = json!({ "gush": gush, "helka": helka });

    match source.plans_for_parcel(gush, helka).await {
        Ok(plans) => {
            events.record(
                LookupEvent::new(
                    source.name(),
                    input,
                    json!({ "plans": plans.len() }),
                    EventStatus::Success,
                )
                .with_duration(started.elapsed()),
            );
            plans
        }
        Err(err) => {
            warn!(source = source.name(), error = %err, "upstream plan source failed");
            let message = err.to_string();
            events.record(
                LookupEvent::new(source.name(), input, json!(null), EventStatus::Error)
                    .with_error(message.clone())
                    .with_duration(started.elapsed()),
            );
            warnings.push(format!("{}: {message}", source.name()));
            Vec::new()
        }
    }
}
