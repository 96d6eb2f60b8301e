use std::collections::HashMap;

use eyre::{ensure, Result};

use crate::board::item::{FixedState, Item, ItemId};
use crate::board::layer::{LayerId, LayerStack};
use crate::board::net::{Net, NetId};
use crate::board::rules::{ClearanceMatrix, NetClass, NetClassId};
use crate::geom::IntBox;
use crate::spatial::{Key, SpatialIndex};

pub const CONNECTION_TOLERANCE: i64 = 100; // 0.01mm at 10,000 units/mm

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProhibitionKind {
    Trace,
    Via,
    Copper,
}

/// Owns every item, keeps the spatial index in lockstep with add/remove, and
/// answers the board-level geometric and connectivity queries the router
/// needs (§4.3).
#[derive(Debug, Default, Clone)]
pub struct Board {
    layers: LayerStack,
    nets: HashMap<NetId, Net>,
    net_classes: HashMap<NetClassId, NetClass>,
    clearance: ClearanceMatrix,
    items: HashMap<ItemId, Item>,
    index: SpatialIndex,
    next_item_id: ItemId,
}

impl Board {
    pub fn new(layers: LayerStack, clearance: ClearanceMatrix) -> Self {
        Self { layers, clearance, ..Default::default() }
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn clearance(&self) -> &ClearanceMatrix {
        &self.clearance
    }

    pub fn add_net(&mut self, net: Net) {
        self.nets.insert(net.id, net);
    }

    pub fn net(&self, id: NetId) -> Option<&Net> {
        self.nets.get(&id)
    }

    pub fn nets(&self) -> impl Iterator<Item = &Net> {
        self.nets.values()
    }

    pub fn add_net_class(&mut self, class: NetClass) {
        self.net_classes.insert(class.id, class);
    }

    pub fn net_class(&self, id: NetClassId) -> Option<&NetClass> {
        self.net_classes.get(&id)
    }

    pub fn net_class_for(&self, net: NetId) -> Option<&NetClass> {
        self.net(net).and_then(|n| n.net_class).and_then(|c| self.net_class(c))
    }

    /// Assigns a fresh id and inserts `item`, keeping the spatial index in
    /// lockstep. Rejects a `Pin` with `FixedState::NotFixed` (invariant (i)
    /// of §3).
    pub fn add_item(&mut self, mut item: Item) -> Result<ItemId> {
        if matches!(item, Item::Pin(_)) {
            ensure!(item.header().fixed != FixedState::NotFixed, "a pin must be UserFixed or SystemFixed");
        }
        let id = self.next_item_id;
        self.next_item_id += 1;
        item.header_mut().id = id;
        item.header_mut().on_board = true;
        self.index_item(&item);
        self.items.insert(id, item);
        Ok(id)
    }

    /// Like [`Board::add_item`] but keeps a caller-chosen id (used when
    /// re-inserting a rolled-back deletion, §4.10).
    pub fn add_item_with_id(&mut self, mut item: Item, id: ItemId) {
        item.header_mut().id = id;
        item.header_mut().on_board = true;
        self.index_item(&item);
        self.items.insert(id, item);
        self.next_item_id = self.next_item_id.max(id + 1);
    }

    pub fn remove_item(&mut self, id: ItemId) -> Option<Item> {
        let mut item = self.items.remove(&id)?;
        self.index.remove(Key::new(id, 0));
        item.header_mut().on_board = false;
        Some(item)
    }

    fn index_item(&mut self, item: &Item) {
        let bbox = item.bbox();
        let (lo, hi) = item.layer_span();
        let layer = if lo == hi { Some(lo) } else { None };
        self.index.insert(Key::new(item.id(), 0), bbox, layer);
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn items_on_net(&self, net: NetId) -> impl Iterator<Item = &Item> {
        self.items.values().filter(move |i| i.nets().contains(&net))
    }

    /// All on-board items whose bounding box intersects `query` on `layer`,
    /// excluding any item sharing a net with `exempt_nets` (invariant (iii)
    /// of §3: sharing a net exempts items from being obstacles to one
    /// another).
    pub fn obstacles_in(&self, query: &IntBox, layer: LayerId, exempt_nets: &[NetId]) -> Vec<&Item> {
        self.index
            .query_overlapping(query, None)
            .into_iter()
            .filter_map(|k| self.items.get(&k.obj))
            .filter(|it| it.spans_layer(layer))
            .filter(|it| exempt_nets.is_empty() || !it.nets().iter().any(|n| exempt_nets.contains(n)))
            .collect()
    }

    pub fn location_prohibited(&self, query: &IntBox, layer: LayerId, kind: ProhibitionKind) -> bool {
        self.items.values().any(|it| {
            let Item::RuleArea(r) = it else { return false };
            if !it.header().on_board || r.layer != layer || !it.bbox().intersects(query) {
                return false;
            }
            match kind {
                ProhibitionKind::Trace => r.prohibit.traces,
                ProhibitionKind::Via => r.prohibit.vias,
                ProhibitionKind::Copper => r.prohibit.copper,
            }
        })
    }

    /// Coarse physical-connectivity relation used by incomplete-connection
    /// discovery (§4.3, §4.8): true if the items' layer spans overlap, their
    /// bounding-box centers lie within [`CONNECTION_TOLERANCE`], and they
    /// share a net.
    pub fn physically_connected(&self, a: &Item, b: &Item) -> bool {
        let (a_lo, a_hi) = a.layer_span();
        let (b_lo, b_hi) = b.layer_span();
        if a_hi < b_lo || b_hi < a_lo {
            return false;
        }
        if !a.header().shares_net(b.header()) {
            return false;
        }
        let ca = a.bbox().center();
        let cb = b.bbox().center();
        ca.dist2(cb) <= CONNECTION_TOLERANCE * CONNECTION_TOLERANCE
    }

    pub fn spatial_index(&self) -> &SpatialIndex {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::item::{ItemHeader, Pin, Trace};
    use crate::board::layer::Layer;
    use crate::geom::PtI;

    fn board() -> Board {
        let layers = LayerStack::new(vec![Layer::new("F.Cu", true), Layer::new("B.Cu", true)]);
        Board::new(layers, ClearanceMatrix::new(1, 2))
    }

    #[test]
    fn test_pin_must_be_fixed() {
        let mut b = board();
        let pin = Item::Pin(Pin {
            header: ItemHeader::new(0, vec![1], 0, FixedState::NotFixed),
            component: "U1".into(),
            center: PtI::new(0, 0),
            radius: 100,
            layer_lo: 0,
            layer_hi: 1,
        });
        assert!(b.add_item(pin).is_err());
    }

    #[test]
    fn test_add_remove_item_updates_index() {
        let mut b = board();
        let trace = Item::Trace(Trace {
            header: ItemHeader::new(0, vec![1], 0, FixedState::NotFixed),
            p0: PtI::new(0, 0),
            p1: PtI::new(100, 0),
            layer: 0,
            half_width: 10,
        });
        let id = b.add_item(trace).unwrap();
        assert_eq!(b.spatial_index().len(), 1);
        assert!(b.item(id).is_some());
        let removed = b.remove_item(id).unwrap();
        assert!(!removed.header().on_board);
        assert_eq!(b.spatial_index().len(), 0);
    }

    #[test]
    fn test_physically_connected_requires_shared_net_and_proximity() {
        let b = board();
        let p1 = Item::Pin(Pin {
            header: ItemHeader::new(0, vec![1], 0, FixedState::UserFixed),
            component: "U1".into(),
            center: PtI::new(0, 0),
            radius: 50,
            layer_lo: 0,
            layer_hi: 1,
        });
        let p2 = Item::Pin(Pin {
            header: ItemHeader::new(0, vec![1], 0, FixedState::UserFixed),
            component: "U1".into(),
            center: PtI::new(50, 0),
            radius: 50,
            layer_lo: 0,
            layer_hi: 1,
        });
        let p3 = Item::Pin(Pin {
            header: ItemHeader::new(0, vec![2], 0, FixedState::UserFixed),
            component: "U2".into(),
            center: PtI::new(50, 0),
            radius: 50,
            layer_lo: 0,
            layer_hi: 1,
        });
        assert!(b.physically_connected(&p1, &p2));
        assert!(!b.physically_connected(&p1, &p3));
        let _ = b;
    }
}
