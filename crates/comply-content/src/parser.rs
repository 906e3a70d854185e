//! Content Parser: normalizes a structured payload into [`ContentBlock`]s.
//!
//! Never fails. A string becomes one text block, an array yields one block
//! per element (malformed elements are skipped), an object yields one block
//! (a malformed object becomes text of its JSON).

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::Span;

use crate::block::ContentBlock;

/// Why a single block could not be decoded.
#[derive(Error, Debug)]
#[error("malformed {block_type} block: {source}")]
pub struct BlockError {
    pub block_type: String,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, Clone)]
pub struct ContentParser {
    span: Span,
}

impl ContentParser {
    pub fn new() -> Self {
        Self {
            span: tracing::debug_span!("content_parser"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn parse(&self, payload: &Value) -> Vec<ContentBlock> {
        let _enter = self.span.enter();
        parse_value(payload)
    }
}

impl Default for ContentParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalizes any payload shape; see the module docs.
pub fn parse_value(payload: &Value) -> Vec<ContentBlock> {
    match payload {
        Value::Null => Vec::new(),
        Value::String(s) => vec![ContentBlock::text(s.clone())],
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| match item {
                Value::Null => None,
                Value::Object(_) => match parse_block(item) {
                    Ok(block) => Some(block),
                    Err(err) => {
                        tracing::warn!(index, error = %err, "skipping malformed content block");
                        None
                    }
                },
                Value::String(s) => Some(ContentBlock::text(s.clone())),
                other => Some(ContentBlock::text(other.to_string())),
            })
            .collect(),
        Value::Object(_) => match parse_block(payload) {
            Ok(block) => vec![block],
            Err(err) => {
                tracing::warn!(error = %err, "rendering malformed content block as text");
                vec![ContentBlock::text(payload.to_string())]
            }
        },
        other => vec![ContentBlock::text(other.to_string())],
    }
}

/// Decodes one object by its `type` field.
///
/// A missing or unrecognized type is not an error: it falls back to text
/// carrying the object's `content`/`text` string, or its JSON.
pub fn parse_block(value: &Value) -> Result<ContentBlock, BlockError> {
    let block_type = value.get("type").and_then(Value::as_str).unwrap_or_default();

    let block = match block_type {
        "text" => ContentBlock::Text(decode(block_type, value)?),
        "code" => ContentBlock::Code(decode(block_type, value)?),
        "table" => ContentBlock::Table(decode(block_type, value)?),
        "tree" => ContentBlock::Tree(decode(block_type, value)?),
        "diff" => ContentBlock::Diff(decode(block_type, value)?),
        "progress" => ContentBlock::Progress(decode(block_type, value)?),
        "collapsible" => ContentBlock::Collapsible(decode(block_type, value)?),
        "list" => ContentBlock::List(decode(block_type, value)?),
        "separator" => ContentBlock::Separator(decode(block_type, value)?),
        other => {
            if !other.is_empty() {
                tracing::debug!(block_type = other, "unknown block type, using text");
            }
            fallback_text(value)
        }
    };
    Ok(block)
}

fn decode<T: DeserializeOwned>(block_type: &str, value: &Value) -> Result<T, BlockError> {
    T::deserialize(value).map_err(|source| BlockError {
        block_type: block_type.to_string(),
        source,
    })
}

fn fallback_text(value: &Value) -> ContentBlock {
    let text = ["content", "text"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string());
    ContentBlock::text(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{TableBlock, TreeNode};
    use serde_json::json;

    #[test]
    fn test_string_becomes_single_text_block() {
        let blocks = ContentParser::new().parse(&json!("hello"));
        assert_eq!(blocks, vec![ContentBlock::text("hello")]);
    }

    #[test]
    fn test_null_yields_nothing() {
        assert!(parse_value(&Value::Null).is_empty());
    }

    #[test]
    fn test_array_skips_malformed_elements() {
        let blocks = parse_value(&json!([
            {"type": "text", "content": "one"},
            {"type": "progress", "value": "not a number"},
            {"type": "table", "headers": ["a"], "rows": [["1"]]},
            42
        ]));

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], ContentBlock::text("one"));
        assert_eq!(
            blocks[1],
            ContentBlock::Table(TableBlock {
                headers: vec!["a".into()],
                rows: vec![vec!["1".into()]],
                title: None,
            })
        );
        assert_eq!(blocks[2], ContentBlock::text("42"));
    }

    #[test]
    fn test_malformed_object_falls_back_to_json_text() {
        let payload = json!({"type": "tree"});
        let blocks = parse_value(&payload);
        assert_eq!(blocks, vec![ContentBlock::text(payload.to_string())]);
    }

    #[test]
    fn test_unknown_type_uses_content_field() {
        let blocks = parse_value(&json!({"type": "chart", "content": "fallback"}));
        assert_eq!(blocks, vec![ContentBlock::text("fallback")]);

        let untyped = json!({"foo": 1});
        assert_eq!(
            parse_value(&untyped),
            vec![ContentBlock::text(untyped.to_string())]
        );
    }

    #[test]
    fn test_tree_defaults_collapsed() {
        let block = parse_block(&json!({
            "type": "tree",
            "root": {"label": "root", "children": [{"label": "leaf"}]}
        }))
        .unwrap();

        let ContentBlock::Tree(tree) = block else {
            panic!("expected tree, got {block:?}");
        };
        assert!(!tree.root.expanded);
        assert_eq!(
            tree.root.children,
            vec![TreeNode {
                label: "leaf".into(),
                expanded: false,
                children: vec![],
            }]
        );
    }

    #[test]
    fn test_progress_accepts_alias() {
        let block = parse_block(&json!({"type": "progress", "progress": 40, "label": "Upload"}))
            .unwrap();
        let ContentBlock::Progress(progress) = block else {
            panic!("expected progress");
        };
        assert_eq!(progress.value, 40.0);
        assert_eq!(progress.label.as_deref(), Some("Upload"));
    }
}
