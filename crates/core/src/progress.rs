//! Progress percentage math for pipeline runs.
//!
//! A run's externally visible percentage reserves the first 10 points for
//! staging and the last 10 for result materialization; the engine's own
//! 0-100 reports are compressed into the middle band.

use std::sync::OnceLock;

use regex::Regex;

/// Percentage reported once staging has finished.
pub const STAGING_PERCENT: i16 = 10;

/// Percentage reported when the engine has exited and materialization
/// begins.
pub const MATERIALIZE_PERCENT: i16 = 90;

/// Terminal percentage of a successful run.
pub const COMPLETE_PERCENT: i16 = 100;

/// Map an engine-reported progress value (0-100) to the externally visible
/// percentage: `10 + floor(P * 0.8)`. Out-of-range input is clamped first.
pub fn scale_engine_percent(engine_percent: f64) -> i16 {
    let p = engine_percent.clamp(0.0, 100.0);
    STAGING_PERCENT + (p * 0.8).floor() as i16
}

/// Extract the engine's progress token from one line of console output.
///
/// The engine's xmlconsole mode embeds `<progress>N</progress>` in stdout
/// lines; lines without a token return `None`.
pub fn parse_progress_token(line: &str) -> Option<f64> {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    let re = TOKEN.get_or_init(|| {
        Regex::new(r"<progress>\s*(\d+(?:\.\d+)?)\s*</progress>").expect("valid progress regex")
    });
    re.captures(line)?.get(1)?.as_str().parse().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
