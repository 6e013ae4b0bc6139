//! Slug generation for topic titles.
//!
//! Maps a free-text title to a lowercase, URL-safe identifier. Turkish
//! diacritics fold to their ASCII neighbors before the alphanumeric filter
//! so "Kahve Keyfi" and "kahve keyfi" collide on purpose; uniqueness is
//! enforced at topic creation.

/// Derive a URL-safe slug from a topic title.
///
/// Folds Turkish diacritics (including dotted/dotless I forms), lowercases,
/// collapses every run of non-alphanumeric characters to a single hyphen and
/// strips hyphens from both ends. The result may be empty for titles with no
/// ASCII-representable characters; callers treat that as a validation error.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars().map(fold_char) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Fold a single character to its ASCII substitution.
///
/// Uppercase dotted İ maps straight to `i`; everything else falls through
/// unchanged and is handled by the alphanumeric filter above.
fn fold_char(c: char) -> char {
    match c {
        'ğ' | 'Ğ' => 'g',
        'ü' | 'Ü' => 'u',
        'ş' | 'Ş' => 's',
        'ı' | 'İ' => 'i',
        'ö' | 'Ö' => 'o',
        'ç' | 'Ç' => 'c',
        other => other,
    }
}
