use regex::RegexBuilder;

/// Whitespace-delimited token count.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn strip_code_blocks(s: &str) -> String {
    let s = s.trim();
    if s.starts_with("```json") {
        s.trim_start_matches("```json").trim_end_matches("```").trim().to_string()
    } else if s.starts_with("```") {
        s.trim_start_matches("```").trim_end_matches("```").trim().to_string()
    } else {
        s.to_string()
    }
}

/// Removes a leading repeat of `title` (optionally behind markdown `#`
/// markers, case-insensitive) and trims the result. The title must fill its
/// whole first line; prose that merely starts with the same words is kept.
pub fn strip_leading_title(text: &str, title: &str) -> String {
    let text = text.trim();
    let title = title.trim();
    if title.is_empty() {
        return text.to_string();
    }

    let escaped = regex::escape(title);
    let pattern = format!(r"^(#+[ \t]*)?{0}[ \t]*(\r?\n|$)", escaped);
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re.replace(text, "").trim().to_string(),
        Err(e) => {
            log::warn!("Could not build title pattern for {:?}: {}", title, e);
            text.to_string()
        }
    }
}

/// Splits generated text on the first sentinel found. Returns the body and,
/// when a sentinel was present, the non-blank lines after it.
pub fn split_on_sentinel<'a>(text: &'a str, sentinels: &[&str]) -> (&'a str, Vec<String>) {
    let found = sentinels
        .iter()
        .filter_map(|s| text.find(s).map(|idx| (idx, s.len())))
        .min_by_key(|(idx, _)| *idx);

    match found {
        Some((idx, len)) => {
            let tail = &text[idx + len..];
            let lines = tail
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
            (&text[..idx], lines)
        }
        None => (text, Vec::new()),
    }
}

/// Lowercase slug for file names, `book` when nothing usable remains.
pub fn slugify(s: &str) -> String {
    let mut out = String::new();
    let mut dash = false;
    for c in s.chars() {
        if c.is_alphanumeric() {
            for l in c.to_lowercase() {
                out.push(l);
            }
            dash = false;
        } else if !out.is_empty() && !dash {
            out.push('-');
            dash = true;
        }
    }
    let out = out.trim_end_matches('-').to_string();
    if out.is_empty() {
        "book".to_string()
    } else {
        out
    }
}
