use crate::board::{ItemId, LayerId};
use crate::geom::{ConvexTile, PtI};
use crate::route::room::RoomId;

pub type DoorId = usize;

/// Shove-branch bookkeeping tag; shove itself is unimplemented (§9 Open
/// Questions) but the field is retained so a future shove pass doesn't need
/// to change the maze-search element layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Adjustment {
    #[default]
    None,
    Left,
    Right,
}

/// Per-section search state, as carried by a `MazeExpansionList` element
/// (the "new"-interface `MazeSearchAlgo`, per the Open Questions
/// resolution: `MazeExpansionList` plus an explicit `occupyNextElement`
/// loop is the authoritative scheme this crate implements).
#[derive(Debug, Clone)]
pub struct MazeSearchElement {
    pub occupied: bool,
    pub g: f64,
    pub back_door: Option<DoorId>,
    pub back_section: usize,
    pub via_ripup: bool,
    pub adjustment: Adjustment,
}

impl Default for MazeSearchElement {
    fn default() -> Self {
        Self { occupied: false, g: f64::INFINITY, back_door: None, back_section: 0, via_ripup: false, adjustment: Adjustment::default() }
    }
}

#[derive(Debug, Clone)]
pub struct DoorSection {
    pub shape: ConvexTile,
    pub element: MazeSearchElement,
}

impl DoorSection {
    pub fn new(shape: ConvexTile) -> Self {
        Self { shape, element: MazeSearchElement::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DoorKind {
    /// Shared edge/area between two expansion rooms.
    Normal,
    /// Absorbs into a start/destination item; always 2-D, one section.
    Target(ItemId),
    /// Layer-change expansion point at a specific (point, layer-range); one
    /// section per compatible destination layer.
    Drill { point: PtI, layer_lo: LayerId, layer_hi: LayerId },
}

/// The unit of expansion in the maze search: a pair of rooms (or a sink, for
/// `Target`/`Drill`) whose shared payload is subdivided into one or more
/// sections. Doors, drills and target doors are represented as one tagged
/// enum rather than a virtual hierarchy (§9).
#[derive(Debug, Clone)]
pub struct Door {
    pub id: DoorId,
    pub room_a: RoomId,
    pub room_b: RoomId,
    pub kind: DoorKind,
    pub sections: Vec<DoorSection>,
}

impl Door {
    pub fn new_normal(room_a: RoomId, room_b: RoomId, shape: ConvexTile) -> Self {
        let sections = split_sections(&shape);
        Self { id: 0, room_a, room_b, kind: DoorKind::Normal, sections }
    }

    pub fn new_target(room: RoomId, item: ItemId, shape: ConvexTile) -> Self {
        Self { id: 0, room_a: room, room_b: room, kind: DoorKind::Target(item), sections: vec![DoorSection::new(shape)] }
    }

    pub fn new_drill(room_lo: RoomId, room_hi: RoomId, point: PtI, layer_lo: LayerId, layer_hi: LayerId, shape: ConvexTile) -> Self {
        Self {
            id: 0,
            room_a: room_lo,
            room_b: room_hi,
            kind: DoorKind::Drill { point, layer_lo, layer_hi },
            sections: vec![DoorSection::new(shape)],
        }
    }

    pub fn is_target(&self) -> bool {
        matches!(self.kind, DoorKind::Target(_))
    }

    pub fn is_drill(&self) -> bool {
        matches!(self.kind, DoorKind::Drill { .. })
    }

    /// The room reached by crossing this door, as seen from `from`.
    pub fn other_room(&self, from: RoomId) -> RoomId {
        if from == self.room_a { self.room_b } else { self.room_a }
    }

    pub fn reset(&mut self) {
        for s in &mut self.sections {
            s.element = MazeSearchElement::default();
        }
    }
}

/// 1-D doors (a shared edge) are subdivided so expansion can target a
/// specific sub-interval; 2-D doors (an overlap area, e.g. from two
/// overlapping prior free-space rooms) stay as a single section.
fn split_sections(shape: &ConvexTile) -> Vec<DoorSection> {
    if shape.dimension() != 1 {
        return vec![DoorSection::new(shape.clone())];
    }
    // A 1-D door is a segment; one section is enough unless it's long
    // enough that subdividing meaningfully narrows later entry-point
    // search. The baseline implementation keeps a single section per door
    // and relies on per-step nearest-point projection (§4.6.1) for
    // fine-grained entry points.
    vec![DoorSection::new(shape.clone())]
}
