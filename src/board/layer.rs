use serde::{Deserialize, Serialize};

pub type LayerId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub is_signal: bool,
}

impl Layer {
    pub fn new(name: impl Into<String>, is_signal: bool) -> Self {
        Self { name: name.into(), is_signal }
    }
}

/// Ordered layer stack: index 0 is the component side, index N-1 is the
/// solder side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id as usize)
    }

    pub fn component_side(&self) -> LayerId {
        0
    }

    pub fn solder_side(&self) -> LayerId {
        self.layers.len().saturating_sub(1) as LayerId
    }

    pub fn is_inner(&self, id: LayerId) -> bool {
        id != self.component_side() && id != self.solder_side()
    }

    pub fn is_signal(&self, id: LayerId) -> bool {
        self.get(id).is_some_and(|l| l.is_signal)
    }

    pub fn signal_layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        (0..self.layers.len() as LayerId).filter(|&l| self.is_signal(l))
    }

    pub fn inner_signal_layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.signal_layers().filter(|&l| self.is_inner(l))
    }

    /// Side bucket used by the destination-distance heuristic: component
    /// side, solder side, or "inner" for everything between.
    pub fn side(&self, id: LayerId) -> Side {
        if id == self.component_side() {
            Side::Component
        } else if id == self.solder_side() {
            Side::Solder
        } else {
            Side::Inner
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Component,
    Inner,
    Solder,
}
