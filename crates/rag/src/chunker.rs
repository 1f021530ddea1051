//! Knowledge chunker
//!
//! Reads the YAML files under `bots/{bot_id}/data/` and produces text
//! chunks ready for embedding generation.
//!
//! Two entry formats:
//! - `text` (alias `string`): content is already readable, combined
//!   with the heading as-is
//! - `structured` (alias `object`): a template string applied to each
//!   item, rendered lines joined under the heading
//!
//! Data-quality problems (missing template fields, blank renderings,
//! unknown formats) are logged and skipped; a missing entry id is a
//! configuration error and aborts the load.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::RagError;

/// A chunk before embedding generation
///
/// Same shape as [`bot_factory_core::Chunk`] minus the vector; the
/// embedding pipeline attaches one per chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChunk {
    pub id: String,
    pub bot_id: String,
    pub category: String,
    pub heading: String,
    pub text: String,
}

/// Entry format, resolved once at load time
///
/// Unknown format tags fall back to `Text` with a warning rather than
/// failing the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryFormat {
    Text,
    Structured,
}

impl EntryFormat {
    fn resolve(tag: Option<&str>, entry_id: &str) -> Self {
        match tag.unwrap_or("text") {
            "text" | "string" => EntryFormat::Text,
            "structured" | "object" => EntryFormat::Structured,
            other => {
                tracing::warn!(
                    entry_id = %entry_id,
                    format = %other,
                    "Unknown entry format, treating as text"
                );
                EntryFormat::Text
            }
        }
    }
}

/// One knowledge file (`entries:` list)
#[derive(Debug, Deserialize)]
struct KnowledgeFile {
    #[serde(default)]
    entries: Vec<KnowledgeEntry>,
}

/// Raw knowledge entry as it appears in YAML
#[derive(Debug, Deserialize)]
struct KnowledgeEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    heading: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    items: Option<Vec<BTreeMap<String, serde_yaml::Value>>>,
}

/// Load and chunk all knowledge data for a bot
///
/// Reads every `*.yml`/`*.yaml` under `bots/{bot_id}/data/` in sorted
/// filename order and flattens the entries into one sequence. Entry
/// order carries no meaning downstream; retrieval re-ranks by
/// similarity.
pub fn load_bot_chunks(bots_dir: &Path, bot_id: &str) -> Result<Vec<PendingChunk>, RagError> {
    let data_dir = bots_dir.join(bot_id).join("data");

    if !data_dir.exists() {
        tracing::warn!(
            bot_id = %bot_id,
            path = %data_dir.display(),
            "Data folder not found"
        );
        return Ok(Vec::new());
    }

    let mut files: Vec<_> = std::fs::read_dir(&data_dir)
        .map_err(|e| RagError::Io(format!("{}: {}", data_dir.display(), e)))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("yml") | Some("yaml")
            )
        })
        .collect();
    files.sort();

    if files.is_empty() {
        tracing::warn!(
            bot_id = %bot_id,
            path = %data_dir.display(),
            "No knowledge files found"
        );
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for file in &files {
        let content = std::fs::read_to_string(file)
            .map_err(|e| RagError::Io(format!("{}: {}", file.display(), e)))?;
        let parsed: KnowledgeFile = serde_yaml::from_str(&content)
            .map_err(|e| RagError::Io(format!("{}: {}", file.display(), e)))?;

        tracing::debug!(
            file = %file.display(),
            entries = parsed.entries.len(),
            "Read knowledge file"
        );
        entries.extend(parsed.entries);
    }

    let mut chunks = Vec::new();
    for entry in entries {
        let id = entry.id.clone().ok_or_else(|| {
            RagError::Config(format!(
                "Knowledge entry without an id in bots/{}/data (heading: {:?})",
                bot_id, entry.heading
            ))
        })?;

        let text = chunk_entry(&entry, &id);

        if text.trim().is_empty() {
            tracing::warn!(bot_id = %bot_id, entry_id = %id, "Skipping empty entry");
            continue;
        }

        chunks.push(PendingChunk {
            id,
            bot_id: bot_id.to_string(),
            category: entry.category.clone().unwrap_or_else(|| "General".to_string()),
            heading: entry.heading.clone().unwrap_or_default(),
            text,
        });
    }

    tracing::info!(bot_id = %bot_id, chunks = chunks.len(), "Chunked bot knowledge");
    Ok(chunks)
}

/// Render one entry to text according to its format
fn chunk_entry(entry: &KnowledgeEntry, entry_id: &str) -> String {
    match EntryFormat::resolve(entry.format.as_deref(), entry_id) {
        EntryFormat::Text => chunk_text_entry(entry),
        EntryFormat::Structured => chunk_structured_entry(entry, entry_id),
    }
}

/// `text` format: heading + blank line + content, whichever are present
fn chunk_text_entry(entry: &KnowledgeEntry) -> String {
    let heading = entry.heading.as_deref().unwrap_or("");
    let content = entry.content.as_deref().unwrap_or("");

    if !heading.is_empty() && !content.is_empty() {
        format!("{}\n\n{}", heading, content)
    } else if !content.is_empty() {
        content.to_string()
    } else {
        heading.to_string()
    }
}

/// `structured` format: template applied per item, joined under the heading
///
/// A missing template or items list degrades to heading-only; an item
/// missing a referenced field is skipped. Neither aborts the entry.
fn chunk_structured_entry(entry: &KnowledgeEntry, entry_id: &str) -> String {
    let heading = entry.heading.as_deref().unwrap_or("");

    let (template, items) = match (&entry.template, &entry.items) {
        (Some(t), Some(i)) if !t.is_empty() && !i.is_empty() => (t, i),
        _ => {
            tracing::warn!(
                entry_id = %entry_id,
                "Structured entry missing template or items"
            );
            return heading.to_string();
        }
    };

    let mut parts = Vec::new();
    if !heading.is_empty() {
        parts.push(heading.to_string());
    }

    for item in items {
        match render_template(template, item) {
            Ok(line) => parts.push(line),
            Err(field) => {
                tracing::warn!(
                    entry_id = %entry_id,
                    field = %field,
                    "Template placeholder not found in item, skipping item"
                );
            }
        }
    }

    parts.join("\n")
}

/// Substitute `{field}` placeholders from an item's fields
///
/// `{{` and `}}` escape literal braces. Returns the missing field name
/// if the item lacks one the template references.
fn render_template(
    template: &str,
    item: &BTreeMap<String, serde_yaml::Value>,
) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                for f in chars.by_ref() {
                    if f == '}' {
                        break;
                    }
                    field.push(f);
                }
                match item.get(&field).and_then(scalar_to_string) {
                    Some(value) => out.push_str(&value),
                    None => return Err(field),
                }
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// Render a scalar item field; null and nested values count as missing
fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
