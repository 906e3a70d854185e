use crate::block::CodeBlock;
use crate::highlight::Highlighter;
use crate::theme::Theme;

pub fn render_code(
    code: &CodeBlock,
    highlighter: &dyn Highlighter,
    line_numbers: bool,
    theme: &Theme,
) -> String {
    let language = code.language.as_deref().unwrap_or("text");
    let highlighted = highlighter.highlight(&code.code, language);
    let show_numbers = code.line_numbers.unwrap_or(line_numbers);

    let mut lines = Vec::new();
    if let Some(title) = &code.title {
        lines.push(theme.apply("header", title));
    }

    let width = highlighted.lines().count().max(1).to_string().len();
    for (index, line) in highlighted.lines().enumerate() {
        if show_numbers {
            let number = format!("{:>width$}", index + 1);
            lines.push(format!("{} │ {line}", theme.apply("muted", &number)));
        } else {
            lines.push(theme.apply("code", line));
        }
    }
    lines.join("\n")
}
