use super::text::{normalize_numeric_token, token_matches_helka};
use super::types::PlanDetail;

pub fn plan_contains_parcel(detail: &PlanDetail, gush: &str, helka: &str) -> bool {
    let normalized_gush = normalize_numeric_token(gush);
    if normalized_gush.is_empty() || helka.trim().is_empty() {
        return false;
    }

    detail
        .parcel_rows
        .iter()
        .filter(|row| normalize_numeric_token(&row.gush) == normalized_gush)
        .any(|row| {
            row.helka_tokens
                .iter()
                .any(|token| token_matches_helka(token, helka))
        })
}
