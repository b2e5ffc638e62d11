use std::collections::BTreeMap;

/// Parses the leading `---`-delimited YAML-ish frontmatter block of a note
/// into a flat key/value map. A note with no opening `---`, or one whose
/// closing `---` is missing, parses to an empty map rather than an error —
/// the caller treats that the same as "no prior state" (`spec.md` §4.2).
pub fn parse_frontmatter(text: &str) -> BTreeMap<String, String> {
    let mut meta = BTreeMap::new();
    if !text.starts_with("---") {
        return meta;
    }
    let lines: Vec<&str> = text.lines().collect();
    let Some(end_idx) = lines.iter().skip(1).position(|l| *l == "---") else {
        return meta;
    };
    // `end_idx` is relative to `lines[1..]`; the closing line sits at
    // `end_idx + 1` in the full vector, matching Python's `lines[1:].index("---") + 1`.
    for line in &lines[1..=end_idx] {
        if let Some((key, value)) = line.split_once(':') {
            meta.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    meta
}

/// Parses a bracketed, comma-separated tag list such as `["a", "b"]` into
/// individual tags, stripping surrounding quotes. Anything not wrapped in
/// `[...]` yields no tags.
pub fn parse_tags(value: &str) -> Vec<String> {
    let stripped = value.trim();
    let Some(inner) = stripped
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
    else {
        return Vec::new();
    };
    let inner = inner.trim();
    if inner.is_empty() {
        return Vec::new();
    }
    inner
        .split(',')
        .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Extracts the body of a `[!summary]` Obsidian-style callout: every
/// consecutive `>`-prefixed line immediately following the line that
/// contains the marker.
pub fn extract_summary_block(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let Some(marker_idx) = lines.iter().position(|l| l.contains("[!summary]")) else {
        return String::new();
    };
    let mut summary_lines = Vec::new();
    for line in &lines[marker_idx + 1..] {
        if !line.starts_with('>') {
            break;
        }
        summary_lines.push(line.trim_start_matches(['>', ' ']).trim_end());
    }
    summary_lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_frontmatter_reads_key_value_pairs() {
        let text = "---\ncitekey: Smith2024\ntags: [\"a\", \"b\"]\n---\nBody\n";
        let meta = parse_frontmatter(text);
        assert_eq!(meta.get("citekey").map(String::as_str), Some("Smith2024"));
        assert_eq!(meta.get("tags").map(String::as_str), Some(r#"["a", "b"]"#));
    }

    #[test]
    fn parse_frontmatter_without_leading_marker_is_empty() {
        assert!(parse_frontmatter("no frontmatter here").is_empty());
    }

    #[test]
    fn parse_frontmatter_without_closing_marker_is_empty() {
        assert!(parse_frontmatter("---\ncitekey: x\nbody text").is_empty());
    }

    #[test]
    fn parse_frontmatter_skips_lines_without_colon() {
        let text = "---\nstray line\ncitekey: x\n---\n";
        let meta = parse_frontmatter(text);
        assert_eq!(meta.len(), 1);
    }

    #[test]
    fn parse_tags_reads_quoted_list() {
        assert_eq!(
            parse_tags(r#"["ml", "rust"]"#),
            vec!["ml".to_string(), "rust".to_string()]
        );
    }

    #[test]
    fn parse_tags_empty_brackets_yields_empty() {
        assert!(parse_tags("[]").is_empty());
    }

    #[test]
    fn parse_tags_without_brackets_yields_empty() {
        assert!(parse_tags("ml, rust").is_empty());
    }

    #[test]
    fn extract_summary_block_collects_blockquote_lines() {
        let text = "# Title\n\n> [!summary]\n> line one\n> line two\n\nMore body\n";
        assert_eq!(extract_summary_block(text), "line one\nline two");
    }

    #[test]
    fn extract_summary_block_without_marker_is_empty() {
        assert!(extract_summary_block("# Title\nNo callout here").is_empty());
    }

    #[test]
    fn extract_summary_block_stops_at_first_non_quote_line() {
        let text = "> [!summary]\n> kept\nnot quoted\n> dropped\n";
        assert_eq!(extract_summary_block(text), "kept");
    }
}
