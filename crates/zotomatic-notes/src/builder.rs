use zotomatic_core::{now_iso8601, NoteBuilderContext};

/// Renders a [`NoteBuilderContext`] into the Markdown text of a note: a
/// `---`-delimited frontmatter block the workflow round-trips through
/// [`crate::frontmatter`], followed by a human-readable body.
pub fn render_markdown(context: &NoteBuilderContext) -> String {
    let mut out = String::new();
    out.push_str("---\n");
    if let Some(citekey) = &context.citekey {
        out.push_str(&format!("citekey: {citekey}\n"));
    }
    out.push_str(&format!("pdf_local: {}\n", context.pdf_path.display()));
    out.push_str(&format!("tags: {}\n", render_tag_list(&all_tags(context))));
    out.push_str(&format!(
        "zotomatic_summary_status: {}\n",
        context.summary_status.as_str()
    ));
    out.push_str(&format!(
        "zotomatic_summary_mode: {}\n",
        context.summary_mode.map(|m| m.as_str()).unwrap_or("")
    ));
    out.push_str(&format!(
        "zotomatic_tag_status: {}\n",
        context.tag_status.as_str()
    ));
    out.push_str(&format!(
        "zotomatic_last_updated: {}\n",
        context.last_updated.clone().unwrap_or_else(now_iso8601)
    ));
    out.push_str("---\n\n");

    out.push_str(&format!("# {}\n\n", context.title));

    let mut meta_lines = Vec::new();
    if !context.authors.is_empty() {
        meta_lines.push(format!("**Authors:** {}", context.authors.join(", ")));
    }
    if let Some(year) = context.year {
        meta_lines.push(format!("**Year:** {year}"));
    }
    if let Some(venue) = &context.venue {
        meta_lines.push(format!("**Venue:** {venue}"));
    }
    if let Some(doi) = &context.doi {
        meta_lines.push(format!("**DOI:** {doi}"));
    }
    if let Some(url) = &context.url {
        meta_lines.push(format!("**URL:** {url}"));
    }
    if !meta_lines.is_empty() {
        out.push_str(&meta_lines.join("  \n"));
        out.push_str("\n\n");
    }

    if let Some(summary) = context.generated_summary.as_deref().filter(|s| !s.is_empty()) {
        out.push_str("> [!summary]\n");
        for line in summary.lines() {
            out.push_str(&format!("> {line}\n"));
        }
        out.push('\n');
    }

    if let Some(abstract_text) = &context.abstract_text {
        out.push_str("## Abstract\n\n");
        out.push_str(abstract_text);
        out.push_str("\n\n");
    }

    if !context.highlights.is_empty() {
        out.push_str("## Highlights\n\n");
        for highlight in &context.highlights {
            out.push_str(&format!("- {highlight}\n"));
        }
        out.push('\n');
    }

    out
}

/// The tags rendered into frontmatter: manually curated tags followed by
/// anything the LLM generated, de-duplicated in order.
fn all_tags(context: &NoteBuilderContext) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    context
        .tags
        .iter()
        .chain(context.generated_tags.iter())
        .filter(|tag| seen.insert(tag.as_str()))
        .cloned()
        .collect()
}

fn render_tag_list(tags: &[String]) -> String {
    let quoted: Vec<String> = tags.iter().map(|t| format!("\"{t}\"")).collect();
    format!("[{}]", quoted.join(", "))
}

/// Sanitizes a citekey into a filesystem-safe filename stem.
pub fn filename_for_citekey(citekey: &str) -> String {
    let sanitized: String = citekey
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{sanitized}.md")
}
