//! Named semantic styles.
//!
//! Renderers ask for a style by name (`"error"`, `"diff_added"`, ...) and
//! never pick colors themselves. A plain theme leaves text untouched.

use std::collections::BTreeMap;

use colored::{Color, Colorize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThemeError {
    #[error("Failed to parse theme: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    /// Any color name `colored` understands, e.g. `"bright blue"`.
    pub fg: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub dim: bool,
    pub underline: bool,
}

impl Style {
    pub fn fg(color: impl Into<String>) -> Self {
        Self {
            fg: Some(color.into()),
            ..Self::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn dim(mut self) -> Self {
        self.dim = true;
        self
    }

    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    pub fn paint(&self, text: &str) -> String {
        let mut styled = text.normal();
        // unknown color names are ignored
        if let Some(color) = self.fg.as_deref().and_then(|name| name.parse::<Color>().ok()) {
            styled = styled.color(color);
        }
        if self.bold {
            styled = styled.bold();
        }
        if self.italic {
            styled = styled.italic();
        }
        if self.dim {
            styled = styled.dimmed();
        }
        if self.underline {
            styled = styled.underline();
        }
        styled.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    #[serde(default)]
    pub plain: bool,
    #[serde(default)]
    pub styles: BTreeMap<String, Style>,
}

impl Theme {
    pub const STYLE_NAMES: [&'static str; 14] = [
        "error",
        "warning",
        "info",
        "muted",
        "header",
        "status_success",
        "status_error",
        "status_warning",
        "status_info",
        "diff_added",
        "diff_removed",
        "diff_hunk",
        "code",
        "focused",
    ];

    /// No escape codes at all.
    pub fn plain() -> Self {
        Self {
            name: "plain".to_string(),
            plain: true,
            styles: BTreeMap::new(),
        }
    }

    pub fn default_dark() -> Self {
        let styles = [
            ("error", Style::fg("bright red").bold()),
            ("warning", Style::fg("yellow")),
            ("info", Style::fg("bright blue")),
            ("muted", Style::fg("bright black").dim()),
            ("header", Style::fg("bright cyan").bold()),
            ("status_success", Style::fg("green")),
            ("status_error", Style::fg("red")),
            ("status_warning", Style::fg("yellow")),
            ("status_info", Style::fg("cyan")),
            ("diff_added", Style::fg("green")),
            ("diff_removed", Style::fg("red")),
            ("diff_hunk", Style::fg("magenta")),
            ("code", Style::fg("bright white")),
            ("focused", Style::fg("bright yellow").bold().underline()),
        ];

        Self {
            name: "dark".to_string(),
            plain: false,
            styles: styles
                .into_iter()
                .map(|(name, style)| (name.to_string(), style))
                .collect(),
        }
    }

    /// Parses a TOML theme. Styles it leaves out come from the dark theme.
    pub fn from_toml(content: &str) -> Result<Self, ThemeError> {
        let mut theme: Theme = toml::from_str(content)?;
        for (name, style) in Self::default_dark().styles {
            theme.styles.entry(name).or_insert(style);
        }
        Ok(theme)
    }

    pub fn style(&self, name: &str) -> Option<&Style> {
        self.styles.get(name)
    }

    /// Styles `text` with the named style; unknown names leave it as is.
    pub fn apply(&self, name: &str, text: &str) -> String {
        if self.plain {
            return text.to_string();
        }
        match self.styles.get(name) {
            Some(style) => style.paint(text),
            None => text.to_string(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_dark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_theme_is_identity() {
        let theme = Theme::plain();
        for name in Theme::STYLE_NAMES {
            assert_eq!(theme.apply(name, "text"), "text");
        }
    }

    #[test]
    fn test_dark_theme_covers_all_names() {
        let theme = Theme::default_dark();
        for name in Theme::STYLE_NAMES {
            assert!(theme.style(name).is_some(), "missing style {name}");
        }
        assert_eq!(theme.apply("no_such_style", "text"), "text");
    }

    #[test]
    fn test_from_toml_fills_missing_styles() {
        let theme = Theme::from_toml(
            r#"
name = "custom"

[styles.error]
fg = "magenta"
underline = true
"#,
        )
        .unwrap();

        assert_eq!(theme.name, "custom");
        let error = theme.style("error").unwrap();
        assert_eq!(error.fg.as_deref(), Some("magenta"));
        assert!(error.underline);
        assert!(!error.bold);
        assert_eq!(theme.style("muted"), Theme::default_dark().style("muted"));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Theme::from_toml("name = ["),
            Err(ThemeError::Parse(_))
        ));
    }
}
