// src/schema/mod.rs

pub mod record;

use chrono::{SecondsFormat, Utc};
use rand::Rng;

pub const MAX_INPUT_LEN: usize = 1000;
pub const MAX_RESPONSE_LEN: usize = 5000;
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Unique id of the form `{prefix}_{8-hex}`.
pub fn generate_id(prefix: &str) -> String {
    let suffix: u32 = rand::rng().random();
    format!("{prefix}_{suffix:08x}")
}

/// UTC timestamp stamped onto every record.
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Truncate to at most `max` characters. Over-long fields are clamped, never
/// rejected.
pub fn clamp_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

pub fn clamp01(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 1.0)
}
