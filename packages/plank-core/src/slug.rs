/// Board slugs: the unique, URL- and filename-friendly key of a board.
use std::convert::Infallible;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static NON_SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

const FALLBACK_SLUG: &str = "board";

/// Longest slug, in bytes. Slugs are ASCII and end up in file names.
pub const MAX_SLUG_LEN: usize = 80;

/// Cut an ASCII slug to at most `max` bytes, preferring a `-` boundary.
fn truncate_slug(slug: &str, max: usize) -> &str {
    if slug.len() <= max {
        return slug;
    }
    let head = &slug[..max];
    let head = if slug.as_bytes()[max] == b'-' {
        head
    } else {
        match head.rfind('-') {
            Some(cut) if cut > 0 => &head[..cut],
            _ => head,
        }
    };
    head.trim_matches('-')
}

/// Derive a slug from a board title: accents stripped, lowercase ASCII
/// alphanumerics joined by single dashes.
pub fn slugify(title: &str) -> String {
    let folded: String = title
        .nfkd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    let slug = NON_SLUG_RE.replace_all(&folded, "-");
    let slug = truncate_slug(slug.trim_matches('-'), MAX_SLUG_LEN);
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Slug for `title` that `is_taken` does not claim yet: `groceries`,
/// then `groceries-2`, `groceries-3`, ... Suffixed slugs stay within
/// `MAX_SLUG_LEN`.
pub fn unique_slug(title: &str, is_taken: impl Fn(&str) -> bool) -> String {
    match try_unique_slug(title, |s| Ok::<_, Infallible>(is_taken(s))) {
        Ok(slug) => slug,
        Err(never) => match never {},
    }
}

/// `unique_slug` with a fallible lookup; the first lookup error is returned.
pub fn try_unique_slug<E>(
    title: &str,
    mut is_taken: impl FnMut(&str) -> Result<bool, E>,
) -> Result<String, E> {
    let base = slugify(title);
    if !is_taken(&base)? {
        return Ok(base);
    }
    let mut n = 2u64;
    loop {
        let suffix = format!("-{}", n);
        let stem = truncate_slug(&base, MAX_SLUG_LEN - suffix.len());
        let candidate = format!("{}{}", stem, suffix);
        if !is_taken(&candidate)? {
            return Ok(candidate);
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Weekly Groceries"), "weekly-groceries");
        assert_eq!(slugify("  Q3 -- Roadmap!! "), "q3-roadmap");
    }

    #[test]
    fn test_slugify_strips_accents() {
        assert_eq!(slugify("Résumé Ideen für Café"), "resume-ideen-fur-cafe");
    }

    #[test]
    fn test_slugify_empty_falls_back() {
        assert_eq!(slugify(""), "board");
        assert_eq!(slugify("!!!"), "board");
        assert_eq!(slugify("日本語"), "board");
    }

    #[test]
    fn test_slugify_caps_length() {
        let long = slugify(&"a".repeat(300));
        assert_eq!(long.len(), MAX_SLUG_LEN);

        let words = slugify(&"word ".repeat(40));
        assert!(words.len() <= MAX_SLUG_LEN);
        assert!(words.ends_with("word"));
        assert!(!words.ends_with('-'));
    }

    #[test]
    fn test_unique_slug_suffix_stays_within_cap() {
        let base = slugify(&"a".repeat(300));
        let slug = unique_slug(&"a".repeat(300), |s| s == base);
        assert_eq!(slug.len(), MAX_SLUG_LEN);
        assert!(slug.ends_with("-2"));
    }

    #[test]
    fn test_try_unique_slug_propagates_lookup_error() {
        let result = try_unique_slug("Groceries", |_| Err::<bool, _>("store unavailable"));
        assert_eq!(result, Err("store unavailable"));
    }

    #[test]
    fn test_unique_slug_appends_counter() {
        let taken = ["groceries", "groceries-2"];
        assert_eq!(
            unique_slug("Groceries", |s| taken.contains(&s)),
            "groceries-3"
        );
        assert_eq!(unique_slug("Chores", |s| taken.contains(&s)), "chores");
    }
}
