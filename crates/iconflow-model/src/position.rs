//! Flat integer positions and their resolution into the tree.
//!
//! A position counts token slots in the flattened document: node open and
//! close boundaries are slots, each character of a text run is a slot.
//! Mark-only edits never change sizes, so positions outside an edited range
//! are stable under them.

use crate::error::PositionError;
use crate::node::{Elem, Node};

/// A position resolved into an ancestor path.
///
/// `path[0]` is the document root; each deeper entry is the node the
/// resolution descended into. Borrows the tree it was resolved against.
#[derive(Debug, Clone)]
pub struct ResolvedPos<'a> {
    pub pos: usize,
    path: Vec<PathEntry<'a>>,
    /// Offset within the deepest node's content.
    pub parent_offset: usize,
}

#[derive(Debug, Clone)]
struct PathEntry<'a> {
    node: &'a Elem,
    /// Index of the child the descent continued into; at the deepest level,
    /// the index of the child at or after `parent_offset`.
    index: usize,
    /// Absolute position where this node's content starts.
    start: usize,
}

/// Resolve `pos` against `doc`, or fail if it lies outside `[0, doc_size]`.
pub fn resolve(doc: &Node, pos: usize) -> Result<ResolvedPos<'_>, PositionError> {
    let size = doc.content_size();
    let root = match doc {
        Node::Elem(e) => e,
        Node::Text(_) => return Err(PositionError::OutOfRange { pos, size: 0 }),
    };
    if pos > size {
        return Err(PositionError::OutOfRange { pos, size });
    }

    let mut path = Vec::new();
    let mut cur = root;
    let mut start = 0;
    let mut offset = pos;
    loop {
        let (index, child_start) = cur.content.find_index(offset);
        path.push(PathEntry {
            node: cur,
            index,
            start,
        });
        let Some(child) = cur.content.child(index) else {
            break; // at the end of this node's content
        };
        if offset == child_start {
            break; // boundary before the child
        }
        match child {
            Node::Text(_) => break, // inside a text run
            Node::Elem(e) if e.leaf => break,
            Node::Elem(e) => {
                start += child_start + 1;
                offset -= child_start + 1;
                cur = e;
            }
        }
    }
    Ok(ResolvedPos {
        pos,
        path,
        parent_offset: offset,
    })
}

impl<'a> ResolvedPos<'a> {
    /// Number of ancestors below the root. Zero means the position is
    /// directly in the document's content.
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// The ancestor node at `depth`.
    pub fn node(&self, depth: usize) -> &'a Elem {
        self.path[depth].node
    }

    /// The node the position points into.
    pub fn parent(&self) -> &'a Elem {
        self.node(self.depth())
    }

    /// Child index at `depth`: the child descended into, or (at the deepest
    /// level) the child at or after the position.
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    /// Child index after the position at `depth`: the first child wholly
    /// behind it.
    pub fn index_after(&self, depth: usize) -> usize {
        if depth < self.depth() {
            return self.index(depth) + 1;
        }
        let (index, child_start) = self.parent().content.find_index(self.parent_offset);
        if self.parent_offset == child_start {
            index
        } else {
            index + 1
        }
    }

    /// Absolute position where the content of the ancestor at `depth` starts.
    pub fn start(&self, depth: usize) -> usize {
        self.path[depth].start
    }

    /// Absolute position where the content of the ancestor at `depth` ends.
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content.size()
    }

    /// Position just before the ancestor at `depth` (which must be >= 1).
    pub fn before(&self, depth: usize) -> usize {
        self.start(depth) - 1
    }

    /// Position just after the ancestor at `depth` (which must be >= 1).
    pub fn after(&self, depth: usize) -> usize {
        self.end(depth) + 1
    }

    /// Whether the position sits at a child boundary of its parent.
    pub fn at_child_boundary(&self) -> bool {
        let (_, child_start) = self.parent().content.find_index(self.parent_offset);
        self.parent_offset == child_start
    }

    /// The child immediately after the position, if it starts exactly here.
    pub fn node_after(&self) -> Option<&'a Node> {
        let (index, child_start) = self.parent().content.find_index(self.parent_offset);
        if self.parent_offset == child_start {
            self.parent().content.child(index)
        } else {
            None
        }
    }

    /// Deepest depth at which this position and `other` share an ancestor.
    pub fn shared_depth(&self, other: &ResolvedPos<'_>) -> usize {
        let mut d = self.depth().min(other.depth());
        while d > 0 && self.start(d) != other.start(d) {
            d -= 1;
        }
        d
    }
}
