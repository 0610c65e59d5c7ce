//! Slug generation and URL assembly.

use unicode_segmentation::UnicodeSegmentation;

/// Convert a string to a URL-safe slug
///
/// Rules:
/// - Lowercase
/// - Every run of non-alphanumeric characters becomes one hyphen
/// - Trim leading/trailing hyphens
///
/// Punctuation separates rather than vanishes, so `a&b` and `ab` keep
/// distinct slugs.
///
/// # Examples
///
/// ```
/// use indexpages_core::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("Rust & Safety"), "rust-safety");
/// ```
pub fn slugify(input: &str) -> String {
    let lowercased = input.to_lowercase();

    let mut slug = String::with_capacity(lowercased.len());
    for g in lowercased.graphemes(true) {
        let Some(c) = g.chars().next() else {
            continue;
        };
        if c.is_alphanumeric() {
            slug.push_str(g);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    slug.trim_end_matches('-').to_string()
}

/// Slugify each `/`-separated segment of `input`
///
/// A trailing file extension on the last segment survives, so a slug rule
/// can produce `archive/2020.html`. Empty segments are dropped.
pub fn slugify_path(input: &str) -> String {
    let segments: Vec<&str> = input.split('/').filter(|s| !s.is_empty()).collect();
    let last = segments.len().saturating_sub(1);
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| match segment.rsplit_once('.') {
            Some((stem, ext)) if i == last && !stem.is_empty() && !ext.is_empty() => {
                format!("{}.{}", slugify(stem), slugify(ext))
            }
            _ => slugify(segment),
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join URL pieces into an absolute URL path
///
/// Pieces may carry their own slashes. A trailing slash is appended when
/// `trailing_slash` is set.
pub fn build_url<S: AsRef<str>>(pieces: &[S], trailing_slash: bool) -> String {
    let mut url = String::from("/");
    for piece in pieces {
        let piece = piece.as_ref().trim_matches('/');
        if piece.is_empty() {
            continue;
        }
        if !url.ends_with('/') {
            url.push('/');
        }
        url.push_str(piece);
    }
    if trailing_slash && !url.ends_with('/') {
        url.push('/');
    }
    url
}
