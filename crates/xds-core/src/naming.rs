//! # Key Naming
//!
//! Every schema key yields two derived names: a normalized `var` token
//! (usable as an identifier) and a human `alias` label. `First Name!`
//! becomes `first_name_` / `First Name`.

/// Words kept upper-case in aliases rather than title-cased.
const NO_XLATION_SPECIALS: &[&str] = &["LOB", "PL", "PI"];

/// Derive the `(var, alias)` pair for a key.
///
/// `var` collapses every run of non-word characters (anything other than
/// alphanumerics and `_`) into a single `_` and lowercases the result.
/// `alias` title-cases each `_`-separated word of `var` and joins them
/// with spaces; the special words `LOB`, `PL` and `PI` stay upper-case.
pub fn xlate(key: &str) -> (String, String) {
    let mut var = String::with_capacity(key.len());
    let mut in_run = false;
    for c in key.chars() {
        if c.is_alphanumeric() || c == '_' {
            var.extend(c.to_lowercase());
            in_run = false;
        } else if !in_run {
            var.push('_');
            in_run = true;
        }
    }

    let alias = var
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let upper = word.to_uppercase();
            if NO_XLATION_SPECIALS.contains(&upper.as_str()) {
                upper
            } else {
                title_case(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    (var, alias)
}

/// Title-case a word: upper-case each letter that follows a non-letter,
/// lower-case every other letter (`2nd` → `2Nd`, `mIXed` → `Mixed`).
pub fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev_is_letter = false;
    for c in word.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}
