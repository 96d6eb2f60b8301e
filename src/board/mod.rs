//! Board model: items, layers, nets and clearance/net-class rules (spec
//! components 3 and 4).

pub mod item;
pub mod layer;
pub mod net;
pub mod pcb;
pub mod rules;

pub use item::{FixedState, Item, ItemId};
pub use layer::{Layer, LayerId, LayerStack};
pub use net::{Net, NetId};
pub use pcb::{Board, ProhibitionKind};
pub use rules::{ClearanceClass, ClearanceMatrix, NetClass, NetClassId, ViaDef, ViaRule};
