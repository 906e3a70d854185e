//! Content Renderer: turns a structured payload into display lines.
//!
//! Each top-level block, and each block nested in an expanded collapsible,
//! becomes one [`RenderedContent`]. Ids are derived from the block's
//! position (`block-0`, `block-2.1`, ...) so they stay stable across
//! re-renders of the same payload; collapsibles use their own id, or
//! `section-<path>` without one.

mod code;
mod diff;
mod list;
mod progress;
mod separator;
mod table;
mod tree;

use std::sync::Arc;

use comply_core::ClientConfig;
use comply_core::config::RenderConfig;
use serde_json::Value;
use tracing::Span;

use crate::block::{CollapsibleBlock, ContentBlock, TextBlock};
use crate::collapsible::{CollapsibleError, CollapsibleManager, HistoryPreferences, SectionInfo};
use crate::highlight::{Highlighter, PlainHighlighter};
use crate::parser::ContentParser;
use crate::theme::Theme;

pub use code::render_code;
pub use diff::render_diff;
pub use list::render_list;
pub use progress::{BAR_WIDTH, render_progress};
pub use separator::{MAX_SEPARATOR_WIDTH, render_separator};
pub use table::{MAX_COLUMN_WIDTH, MIN_COLUMN_WIDTH, column_widths, render_table};
pub use tree::render_tree;

const INDENT: &str = "  ";

/// One displayable element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContent {
    pub id: String,
    pub text: String,
    pub focusable: bool,
    /// Set for collapsible headers only.
    pub expanded: Option<bool>,
    /// Number of enclosing collapsibles.
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub max_table_rows: usize,
    pub line_numbers: bool,
    pub separator_width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&RenderConfig::default())
    }
}

impl From<&RenderConfig> for RenderOptions {
    fn from(config: &RenderConfig) -> Self {
        Self {
            max_table_rows: config.max_table_rows,
            line_numbers: config.line_numbers,
            separator_width: config.separator_width,
        }
    }
}

pub struct ContentRenderer {
    options: RenderOptions,
    highlighter: Arc<dyn Highlighter>,
    parser: ContentParser,
    collapsibles: CollapsibleManager,
    span: Span,
}

impl ContentRenderer {
    pub fn new(options: RenderOptions, history: HistoryPreferences) -> Self {
        let span = tracing::debug_span!("content_renderer");
        Self {
            options,
            highlighter: Arc::new(PlainHighlighter),
            parser: ContentParser::new().with_span(span.clone()),
            collapsibles: CollapsibleManager::new(history).with_span(span.clone()),
            span,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            RenderOptions::from(&config.render),
            HistoryPreferences::from(&config.history),
        )
    }

    pub fn with_highlighter(mut self, highlighter: Arc<dyn Highlighter>) -> Self {
        self.highlighter = highlighter;
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn collapsibles(&self) -> &CollapsibleManager {
        &self.collapsibles
    }

    pub fn collapsibles_mut(&mut self) -> &mut CollapsibleManager {
        &mut self.collapsibles
    }

    /// Parses and renders a payload. Never fails.
    ///
    /// Collapsibles seen for the first time are registered with their
    /// declared expansion; known ones keep their current state.
    pub fn render_content(&mut self, payload: &Value, theme: &Theme) -> Vec<RenderedContent> {
        let blocks = self.parser.parse(payload);
        self.render_blocks(&blocks, theme)
    }

    pub fn render_blocks(&mut self, blocks: &[ContentBlock], theme: &Theme) -> Vec<RenderedContent> {
        let mut output = Vec::new();
        for (index, block) in blocks.iter().enumerate() {
            self.render_block(block, &index.to_string(), 0, theme, &mut output);
        }
        self.span.in_scope(|| {
            tracing::trace!(blocks = blocks.len(), rendered = output.len(), "rendered content");
        });
        output
    }

    pub fn toggle_collapsible(&mut self, id: &str) -> Result<bool, CollapsibleError> {
        self.collapsibles.toggle_section(id)
    }

    pub fn expand_all(&mut self) {
        self.collapsibles.expand_all();
    }

    pub fn collapse_all(&mut self) {
        self.collapsibles.collapse_all();
    }

    fn render_block(
        &mut self,
        block: &ContentBlock,
        path: &str,
        depth: usize,
        theme: &Theme,
        output: &mut Vec<RenderedContent>,
    ) {
        let text = match block {
            ContentBlock::Collapsible(section) => {
                self.render_collapsible(section, path, depth, theme, output);
                return;
            }
            ContentBlock::Text(text) => render_text(text, theme),
            ContentBlock::Code(code) => {
                render_code(code, self.highlighter.as_ref(), self.options.line_numbers, theme)
            }
            ContentBlock::Table(table) => render_table(table, self.options.max_table_rows, theme),
            ContentBlock::Tree(tree) => render_tree(tree),
            ContentBlock::Diff(diff) => render_diff(diff, theme),
            ContentBlock::Progress(progress) => render_progress(progress, theme),
            ContentBlock::List(list) => render_list(list),
            ContentBlock::Separator(separator) => {
                render_separator(separator, self.options.separator_width)
            }
        };

        output.push(RenderedContent {
            id: format!("block-{path}"),
            text: indent(&text, depth),
            focusable: false,
            expanded: None,
            depth,
        });
    }

    fn render_collapsible(
        &mut self,
        section: &CollapsibleBlock,
        path: &str,
        depth: usize,
        theme: &Theme,
        output: &mut Vec<RenderedContent>,
    ) {
        let id = section
            .id
            .clone()
            .unwrap_or_else(|| format!("section-{path}"));
        let level = u32::try_from(depth).unwrap_or(u32::MAX);
        self.collapsibles
            .register_section(&id, SectionInfo::from_block(section, level));

        let expanded = self.collapsibles.is_expanded(&id);
        let glyph = if expanded { "▼" } else { "▶" };
        let style = if self.collapsibles.focused() == Some(id.as_str()) {
            "focused"
        } else {
            "header"
        };
        let header = theme.apply(style, &format!("{glyph} {}", section.title));

        output.push(RenderedContent {
            id,
            text: indent(&header, depth),
            focusable: true,
            expanded: Some(expanded),
            depth,
        });

        if expanded {
            for (index, child) in section.content.iter().enumerate() {
                self.render_block(child, &format!("{path}.{index}"), depth + 1, theme, output);
            }
        }
    }
}

impl Default for ContentRenderer {
    fn default() -> Self {
        Self::new(RenderOptions::default(), HistoryPreferences::default())
    }
}

fn render_text(text: &TextBlock, theme: &Theme) -> String {
    match &text.style {
        Some(style) => theme.apply(style, &text.content),
        None => text.content.clone(),
    }
}

fn indent(text: &str, depth: usize) -> String {
    if depth == 0 {
        return text.to_string();
    }
    let prefix = INDENT.repeat(depth);
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
