//! BSP tree traversal
//!
//! Brushes are reached through the tree: every leaf lists the brushes that
//! touch it, and a brush usually touches many leaves. Walking the tree and
//! collecting into an ordered set yields each reachable brush once.
//!
//! The walk keeps its own stack. Compiled maps can be tens of thousands of
//! nodes deep on degenerate geometry, which is too much for call-stack
//! recursion.

use std::collections::BTreeSet;

use crate::error::{BspError, Result};
use crate::records::{Leaves, Node, NodeRef};

/// Collect the brush indices referenced by any leaf under node 0
///
/// Returns an empty set for a map with no nodes. Child, leaf and leaf-brush
/// references are bounds-checked; a tree that revisits nodes is rejected.
pub fn collect_brush_indices(
    nodes: &[Node],
    leaves: &Leaves,
    leaf_brushes: &[u16],
) -> Result<BTreeSet<u16>> {
    let mut brushes = BTreeSet::new();
    if nodes.is_empty() {
        return Ok(brushes);
    }

    let mut stack: Vec<usize> = Vec::new();
    let mut visited = 0usize;
    let mut current = NodeRef::Internal(0);

    loop {
        // Follow front children down to a leaf
        let leaf_index = loop {
            match current {
                NodeRef::Internal(index) => {
                    let node = nodes.get(index).ok_or(BspError::InvalidReference {
                        field: "node child",
                        value: index as i64,
                        max: nodes.len(),
                    })?;
                    visited += 1;
                    if visited > nodes.len() {
                        return Err(BspError::MalformedTree(nodes.len()));
                    }
                    stack.push(index);
                    current = node.child(0);
                }
                NodeRef::Leaf(index) => break index,
            }
        };

        add_leaf_brushes(leaves, leaf_brushes, leaf_index, &mut brushes)?;

        // Then the back child of the most recent node
        let Some(parent) = stack.pop() else {
            break;
        };
        current = nodes[parent].child(1);
    }

    log::debug!(
        "Tree walk visited {} nodes, found {} unique brushes",
        visited,
        brushes.len()
    );
    Ok(brushes)
}

fn add_leaf_brushes(
    leaves: &Leaves,
    leaf_brushes: &[u16],
    leaf_index: usize,
    brushes: &mut BTreeSet<u16>,
) -> Result<()> {
    let leaf = leaves.get(leaf_index).ok_or(BspError::InvalidReference {
        field: "leaf index",
        value: leaf_index as i64,
        max: leaves.len(),
    })?;

    let first = leaf.first_leaf_brush() as usize;
    let end = first + leaf.num_leaf_brushes() as usize;
    let window = leaf_brushes
        .get(first..end)
        .ok_or(BspError::InvalidReference {
            field: "leaf brush range end",
            value: end as i64,
            max: leaf_brushes.len(),
        })?;

    brushes.extend(window.iter().copied());
    Ok(())
}
