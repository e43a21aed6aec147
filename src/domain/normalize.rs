//! Canonical identifier form used for every id comparison.

/// Trim and case-fold an identifier. Blank input maps to `""`.
pub fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

/// Same as [`normalize_id`], with `None` mapping to `""`.
pub fn normalize_opt(id: Option<&str>) -> String {
    id.map(normalize_id).unwrap_or_default()
}
