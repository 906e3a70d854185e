//! Typed content model.
//!
//! Blocks are discriminated by their `type` field on the wire. Decoding goes
//! through [`crate::parser`], which owns the fallback rules for unknown or
//! malformed blocks.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::parser;

/// One typed unit of structured response content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text(TextBlock),
    Code(CodeBlock),
    Table(TableBlock),
    Tree(TreeBlock),
    Diff(DiffBlock),
    Progress(ProgressBlock),
    Collapsible(CollapsibleBlock),
    List(ListBlock),
    Separator(SeparatorBlock),
}

impl ContentBlock {
    /// All `type` discriminators the parser recognizes.
    pub const KNOWN_TYPES: [&'static str; 9] = [
        "text",
        "code",
        "table",
        "tree",
        "diff",
        "progress",
        "collapsible",
        "list",
        "separator",
    ];

    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(TextBlock {
            content: content.into(),
            style: None,
        })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Code(_) => "code",
            Self::Table(_) => "table",
            Self::Tree(_) => "tree",
            Self::Diff(_) => "diff",
            Self::Progress(_) => "progress",
            Self::Collapsible(_) => "collapsible",
            Self::List(_) => "list",
            Self::Separator(_) => "separator",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TextBlock {
    #[serde(default, alias = "text")]
    pub content: String,
    /// Semantic style name, looked up in the theme.
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlock {
    #[serde(alias = "content")]
    pub code: String,
    #[serde(default)]
    pub language: Option<String>,
    /// Overrides the renderer's line number default when set.
    #[serde(default)]
    pub line_numbers: Option<bool>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TableBlock {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default, deserialize_with = "table_rows")]
    pub rows: Vec<Vec<String>>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TreeBlock {
    pub root: TreeNode,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TreeNode {
    pub label: String,
    /// Children are only drawn when set.
    #[serde(default)]
    pub expanded: bool,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiffBlock {
    #[serde(alias = "diff")]
    pub content: String,
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProgressBlock {
    /// Percentage, 0-100.
    #[serde(alias = "progress")]
    pub value: f64,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A progressively-disclosed section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CollapsibleBlock {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, alias = "children", deserialize_with = "child_blocks")]
    pub content: Vec<ContentBlock>,
    /// Initial expansion, used the first time the section is seen.
    #[serde(default)]
    pub expanded: bool,
    /// Declared nesting level (0 = top level).
    #[serde(default)]
    pub level: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListBlock {
    #[serde(default)]
    pub items: Vec<ListItem>,
    #[serde(default)]
    pub ordered: bool,
}

/// A list entry; the wire form is either a bare string or `{text, children}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawListItem")]
pub struct ListItem {
    pub text: String,
    pub children: Vec<ListItem>,
}

impl ListItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            children: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawListItem {
    Plain(String),
    Nested {
        text: String,
        #[serde(default)]
        children: Vec<ListItem>,
    },
}

impl From<RawListItem> for ListItem {
    fn from(raw: RawListItem) -> Self {
        match raw {
            RawListItem::Plain(text) => Self::new(text),
            RawListItem::Nested { text, children } => Self { text, children },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SeparatorBlock {
    #[serde(default, rename = "char")]
    pub character: Option<String>,
    #[serde(default)]
    pub length: Option<usize>,
    #[serde(default)]
    pub label: Option<String>,
}

fn child_blocks<'de, D>(deserializer: D) -> Result<Vec<ContentBlock>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parser::parse_value(&value))
}

/// Accepts any JSON scalar as a cell; null becomes an empty cell.
fn table_rows<'de, D>(deserializer: D) -> Result<Vec<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows = Vec::<Vec<Value>>::deserialize(deserializer)?;
    Ok(rows
        .into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect())
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
