//! Text utilities: edit distance, fuzzy containment, section extraction and
//! document flattening.

use serde_json::{Map, Value};

/// Characters that, repeated at least three times at the start of a line,
/// mark a section rule (`===`, `---`, `###`, `***`).
const RULE_CHARS: [char; 4] = ['=', '-', '#', '*'];

/// Return the prefix of `text` holding at most `max_chars` characters.
///
/// Always cuts on a character boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Edit distance between two strings, counted in characters.
///
/// Strings shorter than two characters are not compared character by
/// character: equal strings give `0`, anything else gives `2`. Fuzzy matching
/// accepts distances of at most `1`, so very short tokens only ever match
/// exactly.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len() < 2 || b.len() < 2 {
        return if a == b { 0 } else { 2 };
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Case-insensitive, typo-tolerant containment test.
///
/// Matches when `text` contains `term` outright, when it contains any
/// space-separated part of `term` longer than two characters, or when any
/// word of `text` is within edit distance 1 of such a part.
pub fn fuzzy_contains(text: &str, term: &str) -> bool {
    let text = text.to_lowercase();
    let term = term.to_lowercase();
    if text.contains(&term) {
        return true;
    }

    let parts: Vec<&str> = term.split(' ').filter(|p| p.chars().count() > 2).collect();
    if parts.iter().any(|part| text.contains(part)) {
        return true;
    }

    text.split_whitespace()
        .any(|word| parts.iter().any(|part| levenshtein(word, part) <= 1))
}

/// Whether `line` separates two sections: blank, or a rule of three or more
/// `=`, `-`, `#` or `*` characters (which includes `###` headings).
pub fn is_section_boundary(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return true;
    }
    let mut prefix = trimmed.chars().take(3);
    trimmed.chars().count() >= 3 && prefix.all(|c| RULE_CHARS.contains(&c))
}

/// Carve the sections of `text` that contain a trigger line.
///
/// Lines are walked in order. Once a line satisfies `is_trigger`, it and the
/// following lines are collected until the next section boundary. Collected
/// sections are joined with a blank line.
pub fn extract_sections(text: &str, is_trigger: impl Fn(&str) -> bool) -> String {
    let mut sections = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut relevant = false;

    for line in text.split('\n') {
        if is_section_boundary(line) {
            if relevant && !current.is_empty() {
                sections.push(current.join("\n"));
            }
            current.clear();
            relevant = false;
            continue;
        }
        if is_trigger(line) {
            relevant = true;
        }
        if relevant {
            current.push(line);
        }
    }
    if relevant && !current.is_empty() {
        sections.push(current.join("\n"));
    }

    sections.join("\n\n")
}

/// Flatten structured fields into an indented text block.
///
/// Scalars print as `key: value`, lists join their items with `", "`, nested
/// maps print `key:` and then their own entries two spaces deeper. Nulls are
/// skipped.
pub fn render_fields(fields: &Map<String, Value>) -> String {
    let mut out = String::new();
    for (key, value) in fields {
        render_entry(&mut out, key, value, "");
    }
    out
}

fn render_entry(out: &mut String, key: &str, value: &Value, indent: &str) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            out.push_str(&format!("{indent}{key}:\n"));
            let nested = format!("{indent}  ");
            for (k, v) in map {
                render_entry(out, k, v, &nested);
            }
        }
        Value::Array(items) => {
            let joined = items.iter().map(render_list_item).collect::<Vec<_>>().join(", ");
            out.push_str(&format!("{indent}{key}: {joined}\n"));
        }
        scalar => out.push_str(&format!("{indent}{key}: {}\n", render_scalar(scalar))),
    }
}

fn render_list_item(value: &Value) -> String {
    match value {
        Value::Object(_) | Value::Array(_) => value.to_string(),
        scalar => render_scalar(scalar),
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
