//! Entry identity
//!
//! Every entry is addressed by the slug of its display name. Slugs are the
//! only key used for uniqueness checks and link resolution; two names that
//! differ only in case or punctuation collide.

/// Derive the canonical slug for a display name
///
/// Trims surrounding whitespace, lower-cases, replaces every run of
/// non-alphanumeric characters with a single hyphen and strips leading and
/// trailing hyphens ("  Apple Pie! " -> "apple-pie").
///
/// A name with no letters or digits ("???", "🍎") yields an empty slug,
/// which the store rejects as an empty name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut prev_hyphen = true;
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Whether two display names map to the same entry
pub fn same_entry(a: &str, b: &str) -> bool {
    slugify(a) == slugify(b)
}
