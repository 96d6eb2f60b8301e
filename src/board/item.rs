use std::cell::Cell;

use serde::{Deserialize, Serialize};

use crate::board::layer::LayerId;
use crate::board::net::NetId;
use crate::board::rules::ClearanceClass;
use crate::geom::{ConvexTile, IntBox, Pt, PtI};

pub type ItemId = u64;
/// Identifies the pre-computed [`crate::route::connection::Connection`] an
/// item belongs to, if it's been traced as part of one (§4.7).
pub type ConnectionId = u64;

/// Fixed-state strength ordering: `NotFixed < ShoveFix < UserFixed <
/// SystemFixed`. `UserFixed` forbids router movement/deletion; `SystemFixed`
/// forbids both unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FixedState {
    NotFixed,
    ShoveFix,
    UserFixed,
    SystemFixed,
}

impl FixedState {
    pub fn forbids_deletion(&self) -> bool {
        *self >= FixedState::UserFixed
    }

    pub fn forbids_movement(&self) -> bool {
        *self >= FixedState::UserFixed
    }

    pub fn is_ripup_eligible(&self) -> bool {
        *self == FixedState::NotFixed
    }
}

/// Metadata shared by every item variant, per the design note on replacing
/// a class hierarchy with a tagged variant plus a common header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemHeader {
    pub id: ItemId,
    pub nets: Vec<NetId>,
    pub clearance_class: ClearanceClass,
    pub fixed: FixedState,
    pub on_board: bool,
    pub connection: Option<ConnectionId>,
    #[serde(skip)]
    cached_bbox: Cell<Option<IntBox>>,
}

impl ItemHeader {
    pub fn new(id: ItemId, nets: Vec<NetId>, clearance_class: ClearanceClass, fixed: FixedState) -> Self {
        Self { id, nets, clearance_class, fixed, on_board: false, connection: None, cached_bbox: Cell::new(None) }
    }

    pub fn shares_net(&self, other: &ItemHeader) -> bool {
        !self.nets.is_empty() && self.nets.iter().any(|n| other.nets.contains(n))
    }

    fn invalidate_bbox(&self) {
        self.cached_bbox.set(None);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub header: ItemHeader,
    pub p0: PtI,
    pub p1: PtI,
    pub layer: LayerId,
    pub half_width: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Via {
    pub header: ItemHeader,
    pub center: PtI,
    pub radius: i64,
    pub layer_lo: LayerId,
    pub layer_hi: LayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pin {
    pub header: ItemHeader,
    pub component: String,
    pub center: PtI,
    pub radius: i64,
    pub layer_lo: LayerId,
    pub layer_hi: LayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConductionArea {
    pub header: ItemHeader,
    pub layer: LayerId,
    pub outline: Vec<PtI>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardOutline {
    pub header: ItemHeader,
    pub outline: Vec<PtI>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Prohibitions {
    pub traces: bool,
    pub vias: bool,
    pub copper: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleArea {
    pub header: ItemHeader,
    pub layer: LayerId,
    pub outline: Vec<PtI>,
    pub prohibit: Prohibitions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Item {
    Trace(Trace),
    Via(Via),
    Pin(Pin),
    ConductionArea(ConductionArea),
    Outline(BoardOutline),
    RuleArea(RuleArea),
}

impl Item {
    pub fn header(&self) -> &ItemHeader {
        match self {
            Item::Trace(i) => &i.header,
            Item::Via(i) => &i.header,
            Item::Pin(i) => &i.header,
            Item::ConductionArea(i) => &i.header,
            Item::Outline(i) => &i.header,
            Item::RuleArea(i) => &i.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut ItemHeader {
        match self {
            Item::Trace(i) => &mut i.header,
            Item::Via(i) => &mut i.header,
            Item::Pin(i) => &mut i.header,
            Item::ConductionArea(i) => &mut i.header,
            Item::Outline(i) => &mut i.header,
            Item::RuleArea(i) => &mut i.header,
        }
    }

    pub fn id(&self) -> ItemId {
        self.header().id
    }

    pub fn nets(&self) -> &[NetId] {
        &self.header().nets
    }

    pub fn is_pin(&self) -> bool {
        matches!(self, Item::Pin(_))
    }

    pub fn is_routable(&self) -> bool {
        matches!(self, Item::Trace(_) | Item::Via(_))
    }

    /// Inclusive `(lo, hi)` layer span. Items that exist on all layers
    /// (outlines) report the degenerate span `(0, LayerId::MAX)`.
    pub fn layer_span(&self) -> (LayerId, LayerId) {
        match self {
            Item::Trace(t) => (t.layer, t.layer),
            Item::Via(v) => (v.layer_lo, v.layer_hi),
            Item::Pin(p) => (p.layer_lo, p.layer_hi),
            Item::ConductionArea(c) => (c.layer, c.layer),
            Item::RuleArea(r) => (r.layer, r.layer),
            Item::Outline(_) => (0, LayerId::MAX),
        }
    }

    pub fn spans_layer(&self, layer: LayerId) -> bool {
        let (lo, hi) = self.layer_span();
        layer >= lo && layer <= hi
    }

    /// A bounding box derived from the item's geometry, memoized until the
    /// item is mutated. `UserFixed`/`SystemFixed` items never invalidate
    /// (the router can't move them); router-created items invalidate only
    /// via deletion, so the cache is cleared explicitly by board mutation.
    pub fn bbox(&self) -> IntBox {
        if let Some(b) = self.header().cached_bbox.get() {
            return b;
        }
        let b = self.compute_bbox();
        self.header().cached_bbox.set(Some(b));
        b
    }

    pub fn invalidate_bbox(&self) {
        self.header().invalidate_bbox();
    }

    fn compute_bbox(&self) -> IntBox {
        match self {
            Item::Trace(t) => IntBox::enclosing(t.p0, t.p1).expand(t.half_width),
            Item::Via(v) => {
                IntBox::enclosing(v.center, v.center).expand(v.radius)
            }
            Item::Pin(p) => IntBox::enclosing(p.center, p.center).expand(p.radius),
            Item::ConductionArea(c) => IntBox::from_points(c.outline.iter().copied()),
            Item::Outline(o) => IntBox::from_points(o.outline.iter().copied()),
            Item::RuleArea(r) => IntBox::from_points(r.outline.iter().copied()),
        }
    }

    /// The item's shape as a convex tile, inflated by the clearance
    /// compensation offset for `class` on `layer`. Non-convex items
    /// (traces, which are capsule-shaped) are approximated by their
    /// bounding rectangle, which is exact for axis-aligned traces and a
    /// conservative superset otherwise -- adequate for the coarse
    /// obstacle-avoidance role shapes play in room restraining.
    pub fn inflated_shape(&self, compensation: i64) -> ConvexTile {
        let b = self.bbox().expand(compensation);
        ConvexTile::rect(b.lo.to_pt(), b.hi.to_pt())
    }

    pub fn as_convex_tile(&self) -> ConvexTile {
        match self {
            Item::ConductionArea(c) => poly_to_tile(&c.outline),
            Item::Outline(o) => poly_to_tile(&o.outline),
            Item::RuleArea(r) => poly_to_tile(&r.outline),
            _ => {
                let b = self.bbox();
                ConvexTile::rect(b.lo.to_pt(), b.hi.to_pt())
            }
        }
    }
}

fn poly_to_tile(pts: &[PtI]) -> ConvexTile {
    ConvexTile::polygon(pts.iter().map(|p| p.to_pt()).collect::<Vec<Pt>>())
}
