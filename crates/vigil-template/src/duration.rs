//! Duration literals as they appear in template fields: an integer with an
//! optional `s`/`m`/`h`/`d` suffix. A bare number means seconds. A leading
//! `-` (the original `lookup: average -10m` spelling for "the last ten
//! minutes") is accepted and ignored.

use crate::error::{Result, TemplateError};

pub fn parse_duration(s: &str) -> Result<u64> {
    let s = s.trim();
    let s = s.strip_prefix('-').unwrap_or(s);
    if s.is_empty() {
        return Err(TemplateError::Duration(s.to_string()));
    }

    let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => s.split_at(idx),
        None => (s, ""),
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| TemplateError::Duration(s.to_string()))?;

    let secs = match unit {
        "" | "s" => value,
        "m" => value * 60,
        "h" => value * 3600,
        "d" => value * 86400,
        _ => return Err(TemplateError::Duration(s.to_string())),
    };
    Ok(secs)
}
