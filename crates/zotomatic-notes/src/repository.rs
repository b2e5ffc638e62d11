use std::collections::HashMap;
use std::path::{Path, PathBuf};

use zotomatic_core::{FieldStatus, Note, NoteBuilderContext, NoteFrontmatter, SummaryMode};

use crate::builder::{filename_for_citekey, render_markdown};
use crate::error::NoteError;
use crate::frontmatter::parse_frontmatter;

/// Owns the notes output directory: writing new/updated notes and keeping a
/// citekey → path index so C9 can find an existing note for a resolved
/// bibliographic record without re-scanning the directory on every PDF.
pub struct NoteRepository {
    root_dir: PathBuf,
    index: HashMap<String, PathBuf>,
}

impl NoteRepository {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            index: HashMap::new(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Walks the (non-recursive) notes directory once, parsing each `.md`
    /// file's frontmatter and recording its citekey. Call this once at
    /// startup; `add_to_index` keeps it current afterward.
    pub fn build_citekey_index(&mut self) -> Result<(), NoteError> {
        self.index.clear();
        if !self.root_dir.exists() {
            return Ok(());
        }
        let entries = std::fs::read_dir(&self.root_dir).map_err(|source| NoteError::Read {
            path: self.root_dir.display().to_string(),
            source,
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            if let Ok(text) = std::fs::read_to_string(&path) {
                let meta = parse_frontmatter(&text);
                if let Some(citekey) = meta.get("citekey") {
                    self.index.insert(citekey.clone(), path);
                }
            }
        }
        Ok(())
    }

    pub fn add_to_index(&mut self, citekey: &str, path: PathBuf) {
        self.index.insert(citekey.to_string(), path);
    }

    pub fn find_by_citekey(&self, citekey: &str) -> Option<&Path> {
        self.index.get(citekey).map(PathBuf::as_path)
    }

    /// Renders `context` and writes it to `<root_dir>/<citekey>.md`,
    /// creating the output directory if needed, and records the resulting
    /// path in the citekey index.
    pub fn write_note(&mut self, context: &NoteBuilderContext) -> Result<PathBuf, NoteError> {
        std::fs::create_dir_all(&self.root_dir).map_err(|source| NoteError::CreateDir {
            path: self.root_dir.display().to_string(),
            source,
        })?;

        let citekey = context.citekey.clone().unwrap_or_else(|| context.title.clone());
        let path = self.root_dir.join(filename_for_citekey(&citekey));
        let rendered = render_markdown(context);
        std::fs::write(&path, rendered).map_err(|source| NoteError::Write {
            path: path.display().to_string(),
            source,
        })?;
        self.add_to_index(&citekey, path.clone());
        Ok(path)
    }

    /// Reads an existing note's frontmatter and body from disk.
    pub fn read_note(&self, path: &Path) -> Result<Note, NoteError> {
        let text = std::fs::read_to_string(path).map_err(|source| NoteError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let meta = parse_frontmatter(&text);
        let frontmatter = NoteFrontmatter {
            citekey: meta.get("citekey").cloned().unwrap_or_default(),
            pdf_local: meta.get("pdf_local").map(PathBuf::from).unwrap_or_default(),
            tags: crate::frontmatter::parse_tags(meta.get("tags").map(String::as_str).unwrap_or("")),
            summary_status: FieldStatus::parse(
                meta.get("zotomatic_summary_status").map(String::as_str).unwrap_or(""),
            ),
            summary_mode: meta
                .get("zotomatic_summary_mode")
                .filter(|v| !v.is_empty())
                .map(|v| SummaryMode::parse(Some(v))),
            tag_status: FieldStatus::parse(
                meta.get("zotomatic_tag_status").map(String::as_str).unwrap_or(""),
            ),
            last_updated: meta.get("zotomatic_last_updated").cloned().unwrap_or_default(),
        };
        let body = body_after_frontmatter(&text);
        Ok(Note {
            path: path.to_path_buf(),
            frontmatter,
            body,
        })
    }

    /// Overwrites an existing note in place with a freshly rendered body,
    /// preserving its path.
    pub fn update_note(&self, path: &Path, context: &NoteBuilderContext) -> Result<(), NoteError> {
        let rendered = render_markdown(context);
        std::fs::write(path, rendered).map_err(|source| NoteError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// Rewrites only the `pdf_local:` frontmatter line, leaving every other
    /// byte of the file untouched. Used for the **path drift** case, which
    /// never touches `zotomatic_last_updated` (`spec.md` §4.9).
    pub fn update_pdf_local(&self, path: &Path, new_pdf_path: &Path) -> Result<(), NoteError> {
        let text = std::fs::read_to_string(path).map_err(|source| NoteError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let new_line = format!("pdf_local: {}", new_pdf_path.display());
        let mut found = false;
        let mut rewritten = String::with_capacity(text.len());
        for line in text.lines() {
            if !found && line.trim_start().starts_with("pdf_local:") {
                rewritten.push_str(&new_line);
                found = true;
            } else {
                rewritten.push_str(line);
            }
            rewritten.push('\n');
        }
        if !text.ends_with('\n') && rewritten.ends_with('\n') {
            rewritten.pop();
        }
        if !found {
            return Ok(());
        }
        std::fs::write(path, rewritten).map_err(|source| NoteError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

fn body_after_frontmatter(text: &str) -> String {
    if !text.starts_with("---") {
        return text.to_string();
    }
    let lines: Vec<&str> = text.lines().collect();
    match lines.iter().skip(1).position(|l| *l == "---") {
        Some(end_idx) => lines[(end_idx + 2)..].join("\n"),
        None => text.to_string(),
    }
}
