use crate::block::{ListBlock, ListItem};

const BULLETS: [&str; 4] = ["•", "◦", "▪", "▫"];

pub fn bullet(level: usize) -> &'static str {
    BULLETS[level % BULLETS.len()]
}

pub fn render_list(list: &ListBlock) -> String {
    let mut lines = Vec::new();
    push_items(&list.items, list.ordered, 0, &mut lines);
    lines.join("\n")
}

fn push_items(items: &[ListItem], ordered: bool, level: usize, lines: &mut Vec<String>) {
    for (index, item) in items.iter().enumerate() {
        let marker = if ordered {
            format!("{}.", index + 1)
        } else {
            bullet(level).to_string()
        };
        lines.push(format!("{}{marker} {}", "  ".repeat(level), item.text));
        push_items(&item.children, ordered, level + 1, lines);
    }
}
