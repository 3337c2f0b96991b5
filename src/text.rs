/// Collapse every run of whitespace into a single space and trim the ends.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

/// Title key used by the duplicate filter: trimmed and lower-cased.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Looser title key used for fragment matching: whitespace collapsed and lower-cased.
pub fn fold_title(title: &str) -> String {
    normalize_ws(title).to_lowercase()
}

/// Cut `s` to at most `max` characters, appending `marker` when anything was dropped.
pub fn truncate_with_marker(s: &str, max: usize, marker: &str) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}{}", &s[..idx], marker),
        None => s.to_string(),
    }
}
