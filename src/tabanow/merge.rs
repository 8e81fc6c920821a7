use std::collections::HashMap;

use crate::model::{PlanRecord, TABANOW_SOURCE};

use super::search::absolute_url;
use super::text::normalize_plan_code;
use super::types::{MAX_FLOORS_CEILING, PlanDetail, SearchRow};

pub fn plan_merge_key(plan: &PlanRecord) -> String {
    normalize_plan_code(plan.code_or_description())
}

pub fn merge_plan(base: &PlanRecord, incoming: &PlanRecord) -> PlanRecord {
    PlanRecord {
        taba_code: pick_string(&incoming.taba_code, &base.taba_code),
        taba_description: pick_string(&incoming.taba_description, &base.taba_description),
        plan_status: pick_text(&incoming.plan_status, &base.plan_status),
        locality: pick_text(&incoming.locality, &base.locality),
        place: pick_text(&incoming.place, &base.place),
        takanon_url: pick_text(&incoming.takanon_url, &base.takanon_url),
        plan_page_url: pick_text(&incoming.plan_page_url, &base.plan_page_url),
        lot_size_sqm: pick_area(incoming.lot_size_sqm, base.lot_size_sqm),
        max_floors: incoming
            .max_floors
            .filter(|floors| *floors > 0)
            .or(base.max_floors),
        max_buildable_area_sqm: pick_area(
            incoming.max_buildable_area_sqm,
            base.max_buildable_area_sqm,
        ),
        source: pick_text(&incoming.source, &base.source),
    }
}

// First-seen key order; records folded left to right; empty keys dropped.
pub fn dedupe_plans<I>(plans: I) -> Vec<PlanRecord>
where
    I: IntoIterator<Item = PlanRecord>,
{
    let mut merged = Vec::<PlanRecord>::new();
    let mut positions = HashMap::<String, usize>::new();

    for plan in plans {
        let key = plan_merge_key(&plan);
        if key.is_empty() {
            continue;
        }

        match positions.get(&key) {
            Some(&index) => {
                let combined = merge_plan(&merged[index], &plan);
                merged[index] = combined;
            }
            None => {
                positions.insert(key, merged.len());
                merged.push(plan);
            }
        }
    }

    merged
}

pub fn sanitize_plan(plan: PlanRecord) -> PlanRecord {
    PlanRecord {
        lot_size_sqm: plan.lot_size_sqm.filter(|value| is_positive(*value)),
        max_floors: plan
            .max_floors
            .filter(|floors| *floors > 0 && *floors <= MAX_FLOORS_CEILING),
        max_buildable_area_sqm: plan.max_buildable_area_sqm.filter(|value| is_positive(*value)),
        ..plan
    }
}

pub fn merge_plan_lists(primary: Vec<PlanRecord>, secondary: Vec<PlanRecord>) -> Vec<PlanRecord> {
    dedupe_plans(primary.into_iter().chain(secondary))
        .into_iter()
        .map(sanitize_plan)
        .collect()
}

pub fn plan_from_row(row: &SearchRow, detail: Option<&PlanDetail>, base_url: &str) -> PlanRecord {
    let description = [&row.description, &row.place, &row.plan_number]
        .into_iter()
        .find(|value| !value.is_empty())
        .cloned()
        .unwrap_or_default();

    PlanRecord {
        taba_code: row.plan_number.clone(),
        taba_description: description,
        plan_status: non_empty(&row.status),
        locality: non_empty(&row.locality),
        place: non_empty(&row.place),
        takanon_url: detail.and_then(|detail| detail.takanon_url.clone()),
        plan_page_url: non_empty(&row.href).map(|href| absolute_url(base_url, &href)),
        lot_size_sqm: detail.and_then(|detail| detail.lot_size_sqm),
        max_floors: detail.and_then(|detail| detail.max_floors),
        max_buildable_area_sqm: None,
        source: Some(TABANOW_SOURCE.to_string()),
    }
}

pub fn fallback_rows_from_plans(plans: &[PlanRecord]) -> Vec<SearchRow> {
    plans
        .iter()
        .filter(|plan| !plan.taba_code.trim().is_empty())
        .map(|plan| SearchRow {
            locality: plan.locality.clone().unwrap_or_default(),
            plan_number: plan.taba_code.clone(),
            status: plan.plan_status.clone().unwrap_or_default(),
            description: plan.taba_description.clone(),
            place: plan.place.clone().unwrap_or_default(),
            href: plan.plan_page_url.clone().unwrap_or_default(),
        })
        .collect()
}

fn pick_string(incoming: &str, base: &str) -> String {
    if incoming.is_empty() {
        base.to_string()
    } else {
        incoming.to_string()
    }
}

fn pick_text(incoming: &Option<String>, base: &Option<String>) -> Option<String> {
    incoming
        .as_ref()
        .filter(|value| !value.is_empty())
        .or(base.as_ref())
        .cloned()
}

fn pick_area(incoming: Option<f64>, base: Option<f64>) -> Option<f64> {
    incoming.filter(|value| is_positive(*value)).or(base)
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
