use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ResolverError;
use crate::record::MetadataRecord;
use crate::MetadataResolver;

/// Connection settings for the Zotero-backed resolver, mirroring
/// `original_source`'s flat `zotero_api_key` / `zotero_library_id` /
/// `zotero_library_scope` settings.
#[derive(Debug, Clone)]
pub struct ZoteroResolverConfig {
    pub api_key: String,
    pub library_id: String,
    /// `"user"` or `"group"`.
    pub library_scope: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl ZoteroResolverConfig {
    fn library_path(&self) -> String {
        let prefix = if self.library_scope == "group" { "groups" } else { "users" };
        format!("{prefix}/{}", self.library_id)
    }
}

/// C3: resolves a PDF's absolute path against a Zotero library (local or
/// hosted, both speak the same REST shape) by scanning attachment items for
/// a matching file path, then fetching the parent item's bibliographic data.
pub struct ZoteroResolver {
    client: reqwest::Client,
    config: ZoteroResolverConfig,
}

impl ZoteroResolver {
    pub fn new(config: ZoteroResolverConfig) -> Result<Self, ResolverError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ResolverError::Http)?;
        Ok(Self { client, config })
    }

    fn url(&self, suffix: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.library_path(),
            suffix.trim_start_matches('/')
        )
    }

    async fn get_json(&self, url: &str) -> Result<Value, ResolverError> {
        let mut request = self
            .client
            .get(url)
            .header("Zotero-API-Version", "3");
        if !self.config.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.config.api_key));
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ResolverError::Api { status, body });
        }
        response.json::<Value>().await.map_err(ResolverError::Http)
    }

    /// Scans `itemType=attachment` items for one whose stored path or
    /// filename matches `pdf_path`'s basename, the way
    /// `original_source::zotero.client._find_attachment_by_pdf_path` walks
    /// `zot_client.everything(zot_client.items(itemType="attachment"))`.
    async fn find_attachment(&self, pdf_path: &Path) -> Result<Option<(String, String)>, ResolverError> {
        let base_name = pdf_path.file_name().map(|n| n.to_string_lossy().into_owned());
        let Some(base_name) = base_name else {
            return Ok(None);
        };
        let pdf_path_normalized = pdf_path.to_string_lossy().into_owned();

        let mut start = 0usize;
        const PAGE: usize = 100;
        const MAX_PAGES: usize = 50; // safety cap against a runaway library

        for _ in 0..MAX_PAGES {
            let url = self.url(&format!(
                "items?itemType=attachment&limit={PAGE}&start={start}"
            ));
            let page: Value = self.get_json(&url).await?;
            let Value::Array(items) = page else {
                break;
            };
            if items.is_empty() {
                break;
            }
            let page_len = items.len();

            for item in &items {
                let data = item.get("data").cloned().unwrap_or(Value::Null);
                let link_mode = data.get("linkMode").and_then(Value::as_str).unwrap_or("");
                let path_field = data
                    .get("path")
                    .and_then(Value::as_str)
                    .or_else(|| data.get("filename").and_then(Value::as_str))
                    .unwrap_or("");
                let parent = data.get("parentItem").and_then(Value::as_str);

                let matches = if link_mode == "linked_file" {
                    let normalized = normalize_path(path_field);
                    pdf_path_normalized.ends_with(&normalized)
                        || PathBuf::from(path_field).file_name().map(|n| n.to_string_lossy().into_owned()).as_deref() == Some(base_name.as_str())
                } else {
                    PathBuf::from(path_field).file_name().map(|n| n.to_string_lossy().into_owned()).as_deref() == Some(base_name.as_str())
                };

                if matches {
                    if let Some(parent_key) = parent {
                        let attachment_key = item
                            .get("key")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        return Ok(Some((attachment_key, parent_key.to_string())));
                    }
                }
            }

            if page_len < PAGE {
                break;
            }
            start += PAGE;
        }

        Ok(None)
    }

    async fn fetch_record(&self, parent_key: &str, attachment_key: &str) -> Result<MetadataRecord, ResolverError> {
        let item_url = self.url(&format!("items/{parent_key}"));
        let item = self.get_json(&item_url).await?;

        let data = item.get("data").cloned().unwrap_or(Value::Null);
        let meta = item.get("meta").cloned().unwrap_or(Value::Null);

        let citekey = meta
            .get("citationKey")
            .and_then(Value::as_str)
            .map(str::to_string);
        let title = data.get("title").and_then(Value::as_str).map(str::to_string);
        let year = data
            .get("date")
            .and_then(Value::as_str)
            .and_then(extract_year);
        let authors = data
            .get("creators")
            .and_then(Value::as_array)
            .map(|creators| creators.iter().filter_map(creator_name).collect())
            .unwrap_or_default();
        let venue = data
            .get("publicationTitle")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let doi = data
            .get("DOI")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let url = data
            .get("url")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let abstract_text = data
            .get("abstractNote")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let tags = data
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.get("tag").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let highlights = self.fetch_highlights(parent_key).await.unwrap_or_default();

        Ok(MetadataRecord {
            citekey,
            title,
            year,
            authors,
            venue,
            doi,
            url,
            abstract_text,
            highlights,
            tags,
            attachment_key: Some(attachment_key.to_string()),
            parent_key: Some(parent_key.to_string()),
        })
    }

    /// Renders annotation children into `- p.N: text` lines, matching
    /// `original_source::zotero.client._render_annotations`.
    async fn fetch_highlights(&self, parent_key: &str) -> Result<Vec<String>, ResolverError> {
        let url = self.url(&format!("items/{parent_key}/children"));
        let children = self.get_json(&url).await?;
        let Value::Array(children) = children else {
            return Ok(Vec::new());
        };

        let mut highlights = Vec::new();
        for child in children {
            let data = child.get("data").cloned().unwrap_or(Value::Null);
            if data.get("itemType").and_then(Value::as_str) != Some("annotation") {
                continue;
            }
            let text = data.get("text").and_then(Value::as_str).unwrap_or("").trim();
            if text.is_empty() {
                continue;
            }
            let line = match data.get("pageLabel").and_then(Value::as_str) {
                Some(page) if !page.is_empty() => format!("- p.{page}: {text}"),
                _ => format!("- {text}"),
            };
            highlights.push(line);
        }
        Ok(highlights)
    }
}

#[async_trait]
impl MetadataResolver for ZoteroResolver {
    async fn resolve(&self, pdf_path: &Path) -> Result<Option<MetadataRecord>, ResolverError> {
        let Some((attachment_key, parent_key)) = self.find_attachment(pdf_path).await? else {
            return Ok(None);
        };
        let record = self.fetch_record(&parent_key, &attachment_key).await?;
        Ok(Some(record))
    }
}

fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

fn extract_year(date: &str) -> Option<i32> {
    let mut current = String::new();
    for c in date.chars() {
        if c.is_ascii_digit() {
            current.push(c);
            if current.len() == 4 {
                return current.parse().ok();
            }
        } else {
            current.clear();
        }
    }
    None
}

#[derive(Debug, Deserialize)]
struct Creator {
    #[serde(rename = "firstName")]
    first_name: Option<String>,
    #[serde(rename = "lastName")]
    last_name: Option<String>,
    name: Option<String>,
}

fn creator_name(value: &Value) -> Option<String> {
    let creator: Creator = serde_json::from_value(value.clone()).ok()?;
    match (creator.first_name, creator.last_name, creator.name) {
        (Some(first), Some(last), _) => Some(format!("{first} {last}")),
        (_, _, Some(name)) => Some(name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_year_finds_four_consecutive_digits() {
        assert_eq!(extract_year("2020-05-01"), Some(2020));
        assert_eq!(extract_year("May 2019"), Some(2019));
        assert_eq!(extract_year("no year here"), None);
        assert_eq!(extract_year(""), None);
    }

    #[test]
    fn creator_name_prefers_first_last_over_bare_name() {
        let value = serde_json::json!({"firstName": "Ada", "lastName": "Lovelace"});
        assert_eq!(creator_name(&value), Some("Ada Lovelace".to_string()));

        let value = serde_json::json!({"name": "ACME Corp"});
        assert_eq!(creator_name(&value), Some("ACME Corp".to_string()));
    }

    #[test]
    fn library_path_switches_on_scope() {
        let config = ZoteroResolverConfig {
            api_key: String::new(),
            library_id: "123".into(),
            library_scope: "group".into(),
            base_url: "https://api.zotero.org".into(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(config.library_path(), "groups/123");

        let config = ZoteroResolverConfig { library_scope: "user".into(), ..config };
        assert_eq!(config.library_path(), "users/123");
    }
}
