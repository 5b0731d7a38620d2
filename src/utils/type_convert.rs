/// Tokens treated as a missing value when reading text cells
pub const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Check whether a raw cell denotes a missing value
pub fn is_missing(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell.trim())
}

/// Parse a numeric cell, `None` if the cell is not a finite-or-infinite float
///
/// `NaN` spellings are handled by [`is_missing`] before this is reached.
pub fn parse_number(cell: &str) -> Option<f64> {
    let value: f64 = cell.trim().parse().ok()?;
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

/// Parse a boolean cell (`true`/`false`, case-insensitive)
pub fn parse_bool(cell: &str) -> Option<bool> {
    let cell = cell.trim();
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Render a boolean the way pandas writes it
pub fn format_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Render a float in the shortest form that parses back to the same value
///
/// Magnitudes below `1e-4` or from `1e16` up use exponent notation.
pub fn format_float(value: f64) -> String {
    let magnitude = value.abs();
    if value.is_finite() && magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        format!("{:e}", value)
    } else {
        value.to_string()
    }
}

/// Normalize a float so that `NaN` becomes missing
pub fn normalize_float(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}
