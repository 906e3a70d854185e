//! Structured content for the Comply console: block model, parser,
//! collapsible section state and terminal rendering.

pub mod block;
pub mod collapsible;
pub mod highlight;
pub mod parser;
pub mod render;
pub mod theme;

pub use block::{
    CodeBlock, CollapsibleBlock, ContentBlock, DiffBlock, ListBlock, ListItem, ProgressBlock,
    SeparatorBlock, TableBlock, TextBlock, TreeBlock, TreeNode,
};
pub use collapsible::{
    CollapsibleError, CollapsibleManager, CollapsibleState, HistoryPreferences, Navigation,
    SectionInfo, StateSnapshot,
};
pub use highlight::{Highlighter, PlainHighlighter};
pub use parser::ContentParser;
pub use render::{ContentRenderer, RenderOptions, RenderedContent};
pub use theme::{Style, Theme, ThemeError};
