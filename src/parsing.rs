use crate::error::ExporterError;

// Order matters: binary suffixes (Ki, Mi, ...) must be checked before the
// decimal ones so "1Mi" never matches a bare "M".
const BINARY_UNITS: &[(&str, f64)] = &[
    ("Ki", 1024.0),
    ("Mi", 1024.0 * 1024.0),
    ("Gi", 1024.0 * 1024.0 * 1024.0),
    ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Pi", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Ei", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
];

const DECIMAL_UNITS: &[(&str, f64)] = &[
    ("k", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
    ("E", 1e18),
];

/// Parse a cluster memory quantity ("128Mi", "1G", "500") into bytes.
///
/// Malformed input is a hard error, never a default of zero.
pub fn parse_memory_bytes(raw: &str) -> Result<f64, ExporterError> {
    let q = raw.trim();
    if q.is_empty() {
        return Err(ExporterError::quantity(raw, "empty quantity"));
    }

    for (suffix, multiplier) in BINARY_UNITS {
        if let Some(stripped) = q.strip_suffix(suffix) {
            return parse_number(raw, stripped).map(|v| v * multiplier);
        }
    }
    for (suffix, multiplier) in DECIMAL_UNITS {
        if let Some(stripped) = q.strip_suffix(suffix) {
            return parse_number(raw, stripped).map(|v| v * multiplier);
        }
    }

    // No suffix means raw bytes; an unrecognized suffix fails the numeric
    // parse and surfaces here.
    parse_number(raw, q)
}

/// Parse a cluster CPU quantity ("500m", "2", "0.5") into millicores.
///
/// A trailing `m` means the prefix is already millicores; otherwise the
/// value is whole cores.
pub fn parse_cpu_millicores(raw: &str) -> Result<f64, ExporterError> {
    let q = raw.trim();
    if q.is_empty() {
        return Err(ExporterError::quantity(raw, "empty quantity"));
    }

    if let Some(stripped) = q.strip_suffix('m') {
        parse_number(raw, stripped)
    } else {
        parse_number(raw, q).map(|cores| cores * 1000.0)
    }
}

fn parse_number(raw: &str, digits: &str) -> Result<f64, ExporterError> {
    if digits.is_empty() {
        return Err(ExporterError::quantity(raw, "missing numeric value"));
    }
    let value: f64 = digits
        .parse()
        .map_err(|_| ExporterError::quantity(raw, format!("{digits:?} is not a number")))?;
    if !value.is_finite() {
        return Err(ExporterError::quantity(raw, "non-finite value"));
    }
    Ok(value)
}
