use crate::block::{TreeBlock, TreeNode};

/// Children of a node are drawn only when it is expanded.
pub fn render_tree(tree: &TreeBlock) -> String {
    let mut lines = vec![tree.root.label.clone()];
    if tree.root.expanded {
        push_children(&tree.root.children, "", &mut lines);
    }
    lines.join("\n")
}

fn push_children(children: &[TreeNode], prefix: &str, lines: &mut Vec<String>) {
    for (index, child) in children.iter().enumerate() {
        let last = index + 1 == children.len();
        let connector = if last { "└── " } else { "├── " };
        lines.push(format!("{prefix}{connector}{}", child.label));

        if child.expanded && !child.children.is_empty() {
            let continuation = if last { "    " } else { "│   " };
            push_children(&child.children, &format!("{prefix}{continuation}"), lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(label: &str, expanded: bool, children: Vec<TreeNode>) -> TreeNode {
        TreeNode {
            label: label.into(),
            expanded,
            children,
        }
    }

    #[test]
    fn test_connectors() {
        let tree = TreeBlock {
            root: node(
                "src",
                true,
                vec![
                    node("lib", true, vec![node("mod.rs", false, vec![])]),
                    node("main.rs", false, vec![]),
                ],
            ),
        };
        assert_eq!(
            render_tree(&tree),
            "src\n├── lib\n│   └── mod.rs\n└── main.rs"
        );
    }

    #[test]
    fn test_collapsed_nodes_hide_children() {
        let tree = TreeBlock {
            root: node("root", true, vec![node("dir", false, vec![node("hidden", false, vec![])])]),
        };
        assert_eq!(render_tree(&tree), "root\n└── dir");

        let collapsed_root = TreeBlock {
            root: node("root", false, vec![node("dir", false, vec![])]),
        };
        assert_eq!(render_tree(&collapsed_root), "root");
    }
}
