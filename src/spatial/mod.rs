//! Spatial index: a binary tree of bounding boxes with one leaf per
//! (object, shape-index), used for overlap queries during room restraining,
//! drill-site enumeration and board-model obstacle lookups.
//!
//! Nodes live in a flat arena addressed by index (see the "cyclic
//! references" note in the design notes: arena-owned, cross-referenced by
//! index rather than by pointer, so removal never has to chase live
//! references).

use std::collections::HashMap;

use crate::geom::IntBox;

pub type ObjId = u64;
pub type ShapeIdx = u32;
pub type LayerId = u32;

/// Identifies one (object, shape-index) leaf. An object may own more than
/// one shape (e.g. a padstack with per-layer pads); each gets its own key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub obj: ObjId,
    pub shape_idx: ShapeIdx,
}

impl Key {
    pub fn new(obj: ObjId, shape_idx: ShapeIdx) -> Self {
        Self { obj, shape_idx }
    }
}

type NodeIdx = usize;

#[derive(Debug, Clone)]
enum NodeKind {
    Leaf(Key),
    Inner { left: NodeIdx, right: NodeIdx },
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    bbox: IntBox,
    parent: Option<NodeIdx>,
    /// Set only on leaves; `None` means "any layer" (e.g. board outline).
    layer: Option<LayerId>,
}

/// `insert`/`remove`/`queryOverlapping` binary tree over bounding boxes.
/// Never transactional: callers must remove-then-reinsert an item whose
/// bounding box changes while on the board.
#[derive(Debug, Default, Clone)]
pub struct SpatialIndex {
    nodes: Vec<Option<Node>>,
    free: Vec<NodeIdx>,
    root: Option<NodeIdx>,
    leaf_of: HashMap<Key, NodeIdx>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.leaf_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_of.is_empty()
    }

    fn alloc(&mut self, node: Node) -> NodeIdx {
        if let Some(idx) = self.free.pop() {
            self.nodes[idx] = Some(node);
            idx
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn free_node(&mut self, idx: NodeIdx) {
        self.nodes[idx] = None;
        self.free.push(idx);
    }

    fn node(&self, idx: NodeIdx) -> &Node {
        self.nodes[idx].as_ref().expect("dangling spatial index node")
    }

    fn node_mut(&mut self, idx: NodeIdx) -> &mut Node {
        self.nodes[idx].as_mut().expect("dangling spatial index node")
    }

    pub fn insert(&mut self, key: Key, bbox: IntBox, layer: Option<LayerId>) {
        assert!(!self.leaf_of.contains_key(&key), "key already present in spatial index");
        let leaf = self.alloc(Node { kind: NodeKind::Leaf(key), bbox, parent: None, layer });
        self.leaf_of.insert(key, leaf);

        let Some(root) = self.root else {
            self.root = Some(leaf);
            return;
        };
        let sibling = self.choose_leaf(root, &bbox);
        self.insert_as_sibling(sibling, leaf, bbox);
    }

    /// Walks down from `start`, at each inner node picking the child whose
    /// union with `bbox` grows its area least, until it reaches a leaf.
    fn choose_leaf(&self, start: NodeIdx, bbox: &IntBox) -> NodeIdx {
        let mut cur = start;
        loop {
            match &self.node(cur).kind {
                NodeKind::Leaf(_) => return cur,
                NodeKind::Inner { left, right } => {
                    let (left, right) = (*left, *right);
                    let left_inc = self.node(left).bbox.area_increase(bbox);
                    let right_inc = self.node(right).bbox.area_increase(bbox);
                    cur = if left_inc <= right_inc { left } else { right };
                }
            }
        }
    }

    fn insert_as_sibling(&mut self, sibling: NodeIdx, leaf: NodeIdx, leaf_bbox: IntBox) {
        let parent = self.node(sibling).parent;
        let sibling_bbox = self.node(sibling).bbox;
        let new_inner_bbox = sibling_bbox.union_with(&leaf_bbox);
        let inner = self.alloc(Node {
            kind: NodeKind::Inner { left: sibling, right: leaf },
            bbox: new_inner_bbox,
            parent,
            layer: None,
        });
        self.node_mut(sibling).parent = Some(inner);
        self.node_mut(leaf).parent = Some(inner);

        match parent {
            None => self.root = Some(inner),
            Some(p) => {
                match &mut self.node_mut(p).kind {
                    NodeKind::Inner { left, right } => {
                        if *left == sibling {
                            *left = inner;
                        } else {
                            *right = inner;
                        }
                    }
                    NodeKind::Leaf(_) => unreachable!("parent of a node must be inner"),
                }
                self.refresh_ancestors(p);
            }
        }
    }

    fn refresh_ancestors(&mut self, mut idx: NodeIdx) {
        loop {
            let bbox = match &self.node(idx).kind {
                NodeKind::Inner { left, right } => {
                    self.node(*left).bbox.union_with(&self.node(*right).bbox)
                }
                NodeKind::Leaf(_) => return,
            };
            self.node_mut(idx).bbox = bbox;
            match self.node(idx).parent {
                Some(p) => idx = p,
                None => return,
            }
        }
    }

    pub fn remove(&mut self, key: Key) {
        let Some(&leaf) = self.leaf_of.get(&key) else { return };
        self.leaf_of.remove(&key);
        let parent = self.node(leaf).parent;
        self.free_node(leaf);

        let Some(parent) = parent else {
            // leaf was the root
            self.root = None;
            return;
        };
        let sibling = match &self.node(parent).kind {
            NodeKind::Inner { left, right } => if *left == leaf { *right } else { *left },
            NodeKind::Leaf(_) => unreachable!(),
        };
        let grandparent = self.node(parent).parent;
        self.node_mut(sibling).parent = grandparent;
        self.free_node(parent);

        match grandparent {
            None => self.root = Some(sibling),
            Some(gp) => {
                match &mut self.node_mut(gp).kind {
                    NodeKind::Inner { left, right } => {
                        if *left == parent {
                            *left = sibling;
                        } else {
                            *right = sibling;
                        }
                    }
                    NodeKind::Leaf(_) => unreachable!(),
                }
                self.refresh_ancestors(gp);
            }
        }
    }

    pub fn bbox_of(&self, key: Key) -> Option<IntBox> {
        self.leaf_of.get(&key).map(|&idx| self.node(idx).bbox)
    }

    /// All (object, shape-index) keys whose bounding box intersects `box`.
    /// When `layer` is `Some`, leaves recorded under a different `Some`
    /// layer are pruned; leaves with `layer: None` (spans all layers) always
    /// match.
    pub fn query_overlapping(&self, query: &IntBox, layer: Option<LayerId>) -> Vec<Key> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.query_rec(root, query, layer, &mut out);
        }
        out
    }

    fn query_rec(&self, idx: NodeIdx, query: &IntBox, layer: Option<LayerId>, out: &mut Vec<Key>) {
        let node = self.node(idx);
        if !node.bbox.intersects(query) {
            return;
        }
        match &node.kind {
            NodeKind::Leaf(key) => {
                if let (Some(want), Some(have)) = (layer, node.layer) {
                    if want != have {
                        return;
                    }
                }
                out.push(*key);
            }
            NodeKind::Inner { left, right } => {
                self.query_rec(*left, query, layer, out);
                self.query_rec(*right, query, layer, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::PtI;

    fn b(lo: (i64, i64), hi: (i64, i64)) -> IntBox {
        IntBox::new(PtI::new(lo.0, lo.1), PtI::new(hi.0, hi.1))
    }

    #[test]
    fn test_insert_query_remove() {
        let mut idx = SpatialIndex::new();
        idx.insert(Key::new(1, 0), b((0, 0), (10, 10)), Some(1));
        idx.insert(Key::new(2, 0), b((20, 20), (30, 30)), Some(1));
        idx.insert(Key::new(3, 0), b((5, 5), (15, 15)), Some(2));
        assert_eq!(idx.len(), 3);

        let hits = idx.query_overlapping(&b((0, 0), (12, 12)), Some(1));
        assert_eq!(hits, vec![Key::new(1, 0)]);

        let hits_any_layer = idx.query_overlapping(&b((0, 0), (12, 12)), None);
        let mut objs: Vec<_> = hits_any_layer.iter().map(|k| k.obj).collect();
        objs.sort_unstable();
        assert_eq!(objs, vec![1, 3]);

        idx.remove(Key::new(1, 0));
        assert_eq!(idx.len(), 2);
        let hits = idx.query_overlapping(&b((0, 0), (12, 12)), Some(1));
        assert!(hits.is_empty());
    }

    #[test]
    fn test_remove_root_leaf() {
        let mut idx = SpatialIndex::new();
        idx.insert(Key::new(1, 0), b((0, 0), (1, 1)), None);
        idx.remove(Key::new(1, 0));
        assert!(idx.is_empty());
        assert!(idx.query_overlapping(&b((0, 0), (100, 100)), None).is_empty());
    }

    #[test]
    fn test_many_insert_remove_leaves_consistent() {
        let mut idx = SpatialIndex::new();
        for i in 0..50 {
            idx.insert(Key::new(i, 0), b((i as i64, i as i64), (i as i64 + 1, i as i64 + 1)), None);
        }
        for i in (0..50).step_by(2) {
            idx.remove(Key::new(i, 0));
        }
        assert_eq!(idx.len(), 25);
        for i in (0..50).step_by(2) {
            let hits = idx.query_overlapping(&b((i as i64, i as i64), (i as i64 + 1, i as i64 + 1)), None);
            assert!(hits.is_empty());
        }
        for i in (1..50).step_by(2) {
            let hits = idx.query_overlapping(&b((i as i64, i as i64), (i as i64 + 1, i as i64 + 1)), None);
            assert_eq!(hits, vec![Key::new(i, 0)]);
        }
    }
}
