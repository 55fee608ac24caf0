use std::cmp::Ordering;

use super::model::{Category, Node};

fn compare(a: &Node, b: &Node) -> Ordering {
    a.priority()
        .cmp(&b.priority())
        .then_with(|| a.label().cmp(b.label()))
        .then_with(|| a.key().cmp(b.key()))
}

/// Order nodes by classification priority, then label.
///
/// Keys are unique per pass, so the order is total and repeatable.
pub fn sort_nodes(nodes: &mut [Node]) {
    nodes.sort_by(compare);
}

/// Keep only nodes in the selected category.
///
/// A kept group keeps only the children in the category, so every leaf of the
/// result belongs to it. Trimming can lower a group's rank, hence the re-sort.
pub fn apply_filter(nodes: Vec<Node>, filter: Category) -> Vec<Node> {
    if filter == Category::All {
        return nodes;
    }
    let mut kept: Vec<Node> = nodes
        .into_iter()
        .filter(|node| node.matches(filter))
        .map(|node| match node {
            Node::Group(mut group) => {
                group
                    .children
                    .retain(|child| filter.admits(child.classification));
                Node::Group(group)
            }
            other => other,
        })
        .collect();
    sort_nodes(&mut kept);
    kept
}
