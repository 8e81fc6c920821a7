use std::time::Instant;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::fetch::FetchError;
use crate::model::{EventStatus, LookupEvent, PlanRecord};

use super::client::TabanowClient;
use super::merge::{dedupe_plans, fallback_rows_from_plans, merge_plan, plan_from_row};
use super::parcel::plan_contains_parcel;
use super::text::normalize_plan_code;
use super::types::SearchRow;

pub const ENRICH_ACTION: &str = "tabanow.enrich";
pub const DISCOVER_ACTION: &str = "tabanow.discover";

impl TabanowClient {
    pub async fn enrich_plans(
        &self,
        plans: &[PlanRecord],
        gush: &str,
        helka: &str,
    ) -> Vec<PlanRecord> {
        let started = Instant::now();
        let fallback_rows = fallback_rows_from_plans(plans);
        let detail_limit = self.config.max_plan_details;
        let mut enriched = Vec::with_capacity(plans.len());
        let mut failed_plans = 0_usize;

        if plans.len() > detail_limit {
            info!(
                known_plans = plans.len(),
                detail_limit,
                "known plans beyond the detail cap are dropped"
            );
        }

        for plan in plans.iter().take(detail_limit) {
            if plan.taba_code.trim().is_empty() {
                enriched.push(plan.clone());
                continue;
            }

            match self.enrich_single_plan(plan, &fallback_rows, gush, helka).await {
                Ok(merged) => enriched.push(merged),
                Err(err) => {
                    failed_plans += 1;
                    warn!(
                        plan_code = %plan.taba_code,
                        error = %err,
                        "plan enrichment failed, keeping known plan"
                    );
                    enriched.push(plan.clone());
                }
            }
        }

        let result = dedupe_plans(enriched);
        info!(
            gush = %gush,
            helka = %helka,
            known_plans = plans.len(),
            failed_plans,
            plans = result.len(),
            "tabanow enrichment complete"
        );
        self.events.record(
            LookupEvent::new(
                ENRICH_ACTION,
                json!({ "gush": gush, "helka": helka, "known_plans": plans.len() }),
                json!({ "plans": result.len(), "failed_plans": failed_plans }),
                EventStatus::Success,
            )
            .with_duration(started.elapsed()),
        );
        result
    }

    async fn enrich_single_plan(
        &self,
        plan: &PlanRecord,
        fallback_rows: &[SearchRow],
        gush: &str,
        helka: &str,
    ) -> Result<PlanRecord, FetchError> {
        let plan_code = plan.taba_code.trim();
        let rows = self.search_by_number(plan_code).await?;
        let candidates = if rows.is_empty() {
            let wanted = normalize_plan_code(plan_code);
            fallback_rows
                .iter()
                .filter(|row| normalize_plan_code(&row.plan_number) == wanted)
                .cloned()
                .collect()
        } else {
            rows
        };

        // First candidate whose parcel table includes the target wins; otherwise the
        // first fetched candidate is merged so pages without a parcel table still count.
        let mut first_fetched: Option<PlanRecord> = None;
        for candidate in candidates.iter().filter(|row| !row.href.is_empty()) {
            // Any detail failure abandons the whole plan, not just this candidate.
            let detail = self.fetch_plan_detail(&candidate.href).await?;

            let candidate_plan = plan_from_row(candidate, Some(&detail), &self.config.base_url);
            if !detail.parcel_rows.is_empty() && !plan_contains_parcel(&detail, gush, helka) {
                debug!(
                    plan_code = %plan_code,
                    href = %candidate.href,
                    "candidate does not list the target parcel"
                );
                first_fetched.get_or_insert(candidate_plan);
                continue;
            }

            return Ok(merge_plan(plan, &candidate_plan));
        }

        Ok(match first_fetched {
            Some(candidate_plan) => merge_plan(plan, &candidate_plan),
            None => plan.clone(),
        })
    }

    pub async fn find_plans_by_parcel(&self, gush: &str, helka: &str) -> Vec<PlanRecord> {
        let started = Instant::now();
        let input = json!({ "gush": gush, "helka": helka });

        let rows = match self.search_by_block(gush).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(gush = %gush, error = %err, "block search failed");
                self.events.record(
                    LookupEvent::new(DISCOVER_ACTION, input, json!(null), EventStatus::Error)
                        .with_error(err.to_string())
                        .with_duration(started.elapsed()),
                );
                return Vec::new();
            }
        };

        let candidates = rows
            .into_iter()
            .take(self.config.max_plan_details)
            .collect::<Vec<SearchRow>>();
        let mut matched = Vec::new();
        let mut detailed = Vec::new();

        for row in &candidates {
            let detail = match self.fetch_plan_detail(&row.href).await {
                Ok(detail) => detail,
                Err(err) => {
                    warn!(
                        plan_number = %row.plan_number,
                        href = %row.href,
                        error = %err,
                        "plan detail fetch failed, continuing"
                    );
                    continue;
                }
            };

            let plan = plan_from_row(row, Some(&detail), &self.config.base_url);
            if plan_contains_parcel(&detail, gush, helka) {
                matched.push(plan.clone());
            }
            detailed.push(plan);
        }

        let (plans, basis) = if !matched.is_empty() {
            (dedupe_plans(matched), "matched")
        } else if !detailed.is_empty() {
            (dedupe_plans(detailed), "detailed")
        } else {
            let bare = candidates
                .iter()
                .map(|row| plan_from_row(row, None, &self.config.base_url));
            (dedupe_plans(bare), "search_rows")
        };

        info!(
            gush = %gush,
            helka = %helka,
            candidates = candidates.len(),
            plans = plans.len(),
            basis,
            "tabanow discovery complete"
        );
        self.events.record(
            LookupEvent::new(
                DISCOVER_ACTION,
                input,
                json!({ "plans": plans.len(), "candidates": candidates.len(), "basis": basis }),
                EventStatus::Success,
            )
            .with_duration(started.elapsed()),
        );
        plans
    }
}
