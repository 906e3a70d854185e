use crate::block::SeparatorBlock;

const DEFAULT_FILL: char = '─';

/// Upper bound on a rule's length; wider requests are clamped.
pub const MAX_SEPARATOR_WIDTH: usize = 500;

/// A rule of `length` (or `default_width`) characters with an optional
/// centred label.
pub fn render_separator(separator: &SeparatorBlock, default_width: usize) -> String {
    let fill = separator
        .character
        .as_deref()
        .and_then(|c| c.chars().next())
        .unwrap_or(DEFAULT_FILL);
    let length = separator
        .length
        .unwrap_or(default_width)
        .min(default_width.max(MAX_SEPARATOR_WIDTH));

    let Some(label) = separator.label.as_deref().filter(|l| !l.is_empty()) else {
        return fill.to_string().repeat(length);
    };

    let overlay = format!(" {label} ");
    let overlay_length = overlay.chars().count();
    if overlay_length >= length {
        return overlay;
    }
    let left = (length - overlay_length) / 2;
    let right = length - overlay_length - left;
    format!(
        "{}{overlay}{}",
        fill.to_string().repeat(left),
        fill.to_string().repeat(right)
    )
}
