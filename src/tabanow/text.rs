pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<&str>>().join(" ")
}

pub fn normalize_plan_code(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn is_ascii_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|byte| byte.is_ascii_digit())
}

// Digit-only tokens lose their leading zeros; anything else is only trimmed.
pub fn normalize_numeric_token(value: &str) -> String {
    let trimmed = value.trim();
    if !is_ascii_digits(trimmed) {
        return trimmed.to_string();
    }

    let stripped = trimmed.trim_start_matches('0');
    if stripped.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

pub fn token_matches_helka(token: &str, target_helka: &str) -> bool {
    let normalized_target = normalize_numeric_token(target_helka);
    let normalized_token = normalize_whitespace(token);

    if let Some((start_raw, end_raw)) = normalized_token.split_once('-') {
        let (start_raw, end_raw) = (start_raw.trim(), end_raw.trim());
        if !is_ascii_digits(start_raw)
            || !is_ascii_digits(end_raw)
            || !is_ascii_digits(&normalized_target)
        {
            return false;
        }

        let (Ok(start), Ok(end), Ok(target)) = (
            start_raw.parse::<u64>(),
            end_raw.parse::<u64>(),
            normalized_target.parse::<u64>(),
        ) else {
            return false;
        };
        return target >= start.min(end) && target <= start.max(end);
    }

    normalize_numeric_token(&normalized_token) == normalized_target
}
