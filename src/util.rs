// ABOUTME: Utility functions for filename slugs and key transliteration
// ABOUTME: Provides deterministic, collision-resistant output names

const MD_EXT: &str = ".md";

fn id_prefix(page_id: &str, len: usize) -> String {
    page_id.chars().take(len).collect()
}

/// Derive a filesystem-safe file name from a page title.
///
/// ASCII titles become lowercase hyphenated slugs; an empty result falls
/// back to a prefix of the page id. Non-ASCII titles (Japanese etc.) are
/// kept as-is apart from stripping path-hostile characters.
pub fn slugify(title: &str, page_id: &str) -> String {
    if title.trim().is_empty() {
        return format!("{}{}", id_prefix(page_id, 8), MD_EXT);
    }

    if title.is_ascii() {
        let lowered = title.to_lowercase();
        let mut slug = String::with_capacity(lowered.len());
        let mut pending_hyphen = false;
        for c in lowered.chars() {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                if pending_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                pending_hyphen = false;
                slug.push(c);
            } else if c.is_whitespace() || c == '-' {
                pending_hyphen = true;
            }
            // anything else is stripped
        }
        if slug.is_empty() {
            slug = id_prefix(page_id, 8);
        }
        return format!("{}{}", slug, MD_EXT);
    }

    // Non-ASCII: sanitize separators and collapse dot runs (path-traversal
    // defense), keep the rest untouched.
    let mut sanitized = String::with_capacity(title.len());
    let mut dot_run = 0usize;
    for c in title.trim().chars() {
        if c == '.' {
            dot_run += 1;
            continue;
        }
        if dot_run > 0 {
            sanitized.push('.');
            dot_run = 0;
        }
        sanitized.push(match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            other => other,
        });
    }
    if dot_run > 0 {
        sanitized.push('.');
    }
    format!("{}{}", sanitized, MD_EXT)
}

/// Rename a colliding slug by appending a short id fragment. The extension
/// always appears exactly once in the result.
pub fn resolve_slug_conflict(slug: &str, page_id: &str) -> String {
    let base = slug.strip_suffix(MD_EXT).unwrap_or(slug);
    format!("{}-{}{}", base, id_prefix(page_id, 4), MD_EXT)
}

/// Transliterate a property display name into a frontmatter key.
pub fn to_snake_case(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let mut key = String::with_capacity(lowered.len());
    let mut pending_underscore = false;
    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_underscore && !key.is_empty() {
                key.push('_');
            }
            pending_underscore = false;
            key.push(c);
        } else if c.is_whitespace() || c == '_' {
            pending_underscore = true;
        }
        // anything else is stripped
    }
    key
}
