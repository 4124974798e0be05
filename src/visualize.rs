use std::io::{self, Write};

use crate::node::{self, NodeId};
use crate::store::HashStore;

const DIGEST_PREVIEW: usize = 12;

/// Renders the finished tree to `out`, one node per line with box-drawing
/// connectors and truncated digests. Pure consumer of a completed store:
/// reads every node id, writes nothing back.
pub fn render_tree(store: &HashStore, leaf_count: usize, out: &mut impl Write) -> io::Result<()> {
    draw_node(store, leaf_count, 0, 0, out)
}

fn draw_node(
    store: &HashStore,
    leaf_count: usize,
    id: NodeId,
    depth: usize,
    out: &mut impl Write,
) -> io::Result<()> {
    let label = match store.get(id) {
        Some(digest) => format!("{}...", &digest[..DIGEST_PREVIEW]),
        None => "<missing>".to_string(),
    };

    if node::is_leaf(id, leaf_count) {
        let block = node::block_index(id, leaf_count);
        write_line(out, depth, id, &format!("{} (block {})", label, block))?;
        return Ok(());
    }

    write_line(out, depth, id, &label)?;
    draw_node(store, leaf_count, node::left_child(id), depth + 1, out)?;
    draw_node(store, leaf_count, node::right_child(id), depth + 1, out)
}

fn write_line(out: &mut impl Write, depth: usize, id: NodeId, label: &str) -> io::Result<()> {
    if depth == 0 {
        writeln!(out, "{}: {}", id, label)
    } else {
        let indent = "│   ".repeat(depth - 1);
        let connector = if id % 2 == 1 { "├──" } else { "└──" };
        writeln!(out, "{}{} {}: {}", indent, connector, id, label)
    }
}
