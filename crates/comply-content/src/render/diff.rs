use crate::block::DiffBlock;
use crate::theme::Theme;

/// Style name for one unified-diff line.
pub fn line_style(line: &str) -> Option<&'static str> {
    if line.starts_with("+++") || line.starts_with("---") {
        Some("header")
    } else if line.starts_with("@@") {
        Some("diff_hunk")
    } else if line.starts_with('+') {
        Some("diff_added")
    } else if line.starts_with('-') {
        Some("diff_removed")
    } else {
        None
    }
}

pub fn render_diff(diff: &DiffBlock, theme: &Theme) -> String {
    let mut lines = Vec::new();
    if let Some(file) = &diff.file {
        lines.push(theme.apply("header", file));
    }
    for line in diff.content.lines() {
        lines.push(match line_style(line) {
            Some(style) => theme.apply(style, line),
            None => line.to_string(),
        });
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_classification() {
        assert_eq!(line_style("--- a/file"), Some("header"));
        assert_eq!(line_style("@@ -1 +1 @@"), Some("diff_hunk"));
        assert_eq!(line_style("+added"), Some("diff_added"));
        assert_eq!(line_style("-removed"), Some("diff_removed"));
        assert_eq!(line_style(" context"), None);
    }

    #[test]
    fn test_file_header_first() {
        let diff = DiffBlock {
            content: "-a\n+b".into(),
            file: Some("src/lib.rs".into()),
        };
        assert_eq!(render_diff(&diff, &Theme::plain()), "src/lib.rs\n-a\n+b");
    }
}
