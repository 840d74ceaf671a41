//! JSON parser for Ergast-style race results.

use deunicode::deunicode;
use serde_json::Value;

use crate::error::FantasyError;
use crate::services::results_api::RaceResults;

/// Builds the ASCII full name used to match roster entries.
///
/// Accented and other non-ASCII characters are transliterated
/// (`"Pérez"` -> `"Perez"`); ASCII input passes through unchanged.
pub fn normalize_name(given: &str, family: &str) -> String {
    format!("{} {}", deunicode(given), deunicode(family))
}

/// Decodes the body of `/{season}/{round}/results.json` into a result set.
///
/// Reads `MRData.RaceTable.Races[0].Results`; each entry contributes
/// `Driver.givenName`, `Driver.familyName` and `points`.
///
/// # Errors
///
/// Fails when the body is not JSON, the race list is empty, an expected
/// field is missing, or a points value is not a non-negative integer.
pub fn parse_results(bytes: &[u8], season: u16, round: u32, url: &str) -> Result<RaceResults, FantasyError> {
    let json: Value = serde_json::from_slice(bytes).map_err(|e| FantasyError::MalformedJson {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    let races = json
        .pointer("/MRData/RaceTable/Races")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("MRData.RaceTable.Races"))?;
    let race = races.first().ok_or(FantasyError::RaceNotFound { season, round })?;

    let entries = race
        .get("Results")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("MRData.RaceTable.Races[0].Results"))?;

    let mut results = RaceResults::new(season, round);
    results.race_name = race.get("raceName").and_then(Value::as_str).map(str::to_string);

    for (i, entry) in entries.iter().enumerate() {
        let given = entry
            .pointer("/Driver/givenName")
            .and_then(Value::as_str)
            .ok_or_else(|| missing(&format!("Results[{i}].Driver.givenName")))?;
        let family = entry
            .pointer("/Driver/familyName")
            .and_then(Value::as_str)
            .ok_or_else(|| missing(&format!("Results[{i}].Driver.familyName")))?;

        let driver = normalize_name(given, family);
        let points = entry
            .get("points")
            .ok_or_else(|| missing(&format!("Results[{i}].points")))
            .and_then(|v| coerce_points(&driver, v))?;

        results.insert(driver, points);
    }

    Ok(results)
}

/// Coerces a `points` field to an integer.
///
/// Strings must hold an integer; JSON numbers are truncated toward zero.
/// Negative or non-numeric values are rejected.
pub fn coerce_points(driver: &str, value: &Value) -> Result<u32, FantasyError> {
    let invalid = || FantasyError::InvalidPoints {
        driver: driver.to_string(),
        value: value.to_string(),
    };

    match value {
        Value::String(s) => s.trim().parse::<u32>().map_err(|_| invalid()),
        Value::Number(n) => {
            if let Some(int) = n.as_u64() {
                u32::try_from(int).map_err(|_| invalid())
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f >= 0.0 && f < u32::MAX as f64 => Ok(f.trunc() as u32),
                    _ => Err(invalid()),
                }
            }
        }
        _ => Err(invalid()),
    }
}

fn missing(path: &str) -> FantasyError {
    FantasyError::MissingField {
        path: path.to_string(),
    }
}
