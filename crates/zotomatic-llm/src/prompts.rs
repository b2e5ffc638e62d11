//! Prompt templates for each summary/tag mode, mirroring
//! `original_source::llm.prompts.get_prompt`'s system/user template pairs.

use crate::types::ChatMessage;

pub fn summary_quick(language: &str, abstract_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "You write concise academic paper summaries in {language}. \
             Respond with a single paragraph of 2-4 sentences, no preamble."
        )),
        ChatMessage::user(format!("Abstract:\n{abstract_text}")),
    ]
}

pub fn summary_standard(language: &str, abstract_text: &str, section_samples: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "You write concise academic paper summaries in {language}, using the \
             abstract and section excerpts provided. Respond with a single \
             paragraph of 4-6 sentences, no preamble."
        )),
        ChatMessage::user(format!(
            "Abstract:\n{abstract_text}\n\nSection excerpts:\n{section_samples}"
        )),
    ]
}

pub fn summary_deep_chunk(
    language: &str,
    chunk_index: usize,
    chunk_count: usize,
    sentences_min: u32,
    sentences_max: u32,
    chunk_text: &str,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "You summarize one chunk ({chunk_index}/{chunk_count}) of a longer \
             academic paper in {language}. Respond with {sentences_min}-{sentences_max} \
             sentences covering only this chunk's content."
        )),
        ChatMessage::user(chunk_text.to_string()),
    ]
}

pub fn summary_deep_reduce(
    language: &str,
    sentences_min: u32,
    sentences_max: u32,
    abstract_text: &str,
    chunk_summaries: &str,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "You combine per-chunk summaries of an academic paper into one \
             final summary in {language}. Respond with {sentences_min}-{sentences_max} \
             sentences, no preamble."
        )),
        ChatMessage::user(format!(
            "Abstract:\n{abstract_text}\n\nChunk summaries:\n{chunk_summaries}"
        )),
    ]
}

pub fn tags(language: &str, abstract_text: &str, title: &str, tags_max: usize) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "You propose up to {tags_max} short, lowercase topical tags in {language} \
             for an academic paper, as a single comma-separated line with no other text."
        )),
        ChatMessage::user(format!("Title: {title}\nAbstract:\n{abstract_text}")),
    ]
}

pub fn render_section_samples(snippets: &[crate::types::SectionSnippet]) -> String {
    let lines: Vec<String> = snippets
        .iter()
        .filter(|s| !s.title.trim().is_empty())
        .map(|s| {
            if s.preview.trim().is_empty() {
                s.title.clone()
            } else {
                format!("{}\n{}", s.title, s.preview)
            }
        })
        .collect();
    if lines.is_empty() {
        "No additional section excerpts were detected.".to_string()
    } else {
        lines.join("\n\n")
    }
}
