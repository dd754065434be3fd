/// Upstream cut abbreviations and the display grades the storefront filters on.
const CUT_ALIASES: &[(&str, &str)] = &[
    ("ID", "Ideal"),
    ("EX", "Excellent"),
    ("VG", "Very Good"),
    ("G", "Good"),
    ("GD", "Good"),
    ("F", "Fair"),
    ("FR", "Fair"),
    ("P", "Poor"),
    ("PR", "Poor"),
];

/// Map an upstream cut code to its display grade. Unknown codes pass through unchanged.
pub fn display_cut(code: &str) -> &str {
    let trimmed = code.trim();
    CUT_ALIASES
        .iter()
        .find(|(abbr, _)| abbr.eq_ignore_ascii_case(trimmed))
        .map(|(_, display)| *display)
        .unwrap_or(trimmed)
}

/// Case-insensitive comparison between an upstream cut code and a selected grade.
/// Both sides go through [`display_cut`], so "EX" matches "Excellent" and "ex".
pub fn cut_matches(upstream: &str, selected: &str) -> bool {
    display_cut(upstream).eq_ignore_ascii_case(display_cut(selected))
}

/// Grade equality for colors and clarities ("vs1" == "VS1").
pub fn grade_matches(upstream: &str, selected: &str) -> bool {
    upstream.trim().eq_ignore_ascii_case(selected.trim())
}

/// Upper-case every grade for the upstream query vocabulary.
pub fn upper_grades(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_ascii_uppercase())
        .filter(|v| !v.is_empty())
        .collect()
}
