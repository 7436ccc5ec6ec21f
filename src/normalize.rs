/// Arabic harakat that may or may not be typed: fathatan, dammatan, kasratan,
/// fatha, damma, kasra, shadda and sukun (U+064B..=U+0652).
pub fn is_diacritic(c: char) -> bool {
    ('\u{064B}'..='\u{0652}').contains(&c)
}

/// Canonical form of a student name used as the join key between the grades
/// and notes datasets.
///
/// Marks are stripped before whitespace is collapsed, so a mark sitting
/// between two spaces can't leave a double space behind.
pub fn normalize_name(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !is_diacritic(*c)).collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
