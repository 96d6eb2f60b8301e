use serde::{Deserialize, Serialize};

use crate::board::layer::LayerId;

pub type ClearanceClass = u32;
pub type NetClassId = u32;

/// `N_class x N_class x N_layer` clearance matrix. Every stored value is
/// even and non-negative; odd `set_value` inputs round up. Self-clearance
/// (a class against itself) defines a shape-compensation offset of
/// `ceil(value / 2)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearanceMatrix {
    n_class: usize,
    n_layer: usize,
    values: Vec<i64>,
}

impl ClearanceMatrix {
    pub fn new(n_class: usize, n_layer: usize) -> Self {
        Self { n_class, n_layer, values: vec![0; n_class * n_class * n_layer.max(1)] }
    }

    fn index(&self, a: ClearanceClass, b: ClearanceClass, layer: LayerId) -> usize {
        let (a, b, layer) = (a as usize, b as usize, layer as usize);
        assert!(a < self.n_class && b < self.n_class && layer < self.n_layer, "clearance index out of range");
        (a * self.n_class + b) * self.n_layer + layer
    }

    pub fn get_value(&self, a: ClearanceClass, b: ClearanceClass, layer: LayerId) -> i64 {
        self.values[self.index(a, b, layer)]
    }

    /// With a caller-supplied safety margin added for conservative checking.
    pub fn get_value_with_margin(&self, a: ClearanceClass, b: ClearanceClass, layer: LayerId, margin: i64) -> i64 {
        self.get_value(a, b, layer) + margin.max(0)
    }

    /// Sets the clearance symmetrically for `(a, b)` and `(b, a)`; odd
    /// values round up to the next even value.
    pub fn set_value(&mut self, a: ClearanceClass, b: ClearanceClass, layer: LayerId, value: i64) {
        let evened = (value + 1) & !1;
        let ia = self.index(a, b, layer);
        self.values[ia] = evened;
        let ib = self.index(b, a, layer);
        self.values[ib] = evened;
    }

    /// Shape-compensation offset for a single class against itself.
    pub fn compensation(&self, class: ClearanceClass, layer: LayerId) -> i64 {
        (self.get_value(class, class, layer) + 1) / 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViaDef {
    pub radius: f64,
    pub layer_lo: LayerId,
    pub layer_hi: LayerId,
    pub cost: f64,
    /// A "cheap" via rule variant used by the heuristic's admissibility
    /// floor alongside the normal via cost (see `minCheapViaCost`).
    pub cheap: bool,
}

/// Ordered list of via definitions preferred in order for a net-class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViaRule {
    pub vias: Vec<ViaDef>,
}

impl ViaRule {
    /// First via definition spanning `lo..=hi` (inclusive), in preference
    /// order.
    pub fn preferred_for_span(&self, lo: LayerId, hi: LayerId) -> Option<&ViaDef> {
        self.vias.iter().find(|v| v.layer_lo <= lo && v.layer_hi >= hi)
    }

    pub fn min_cost(&self, cheap: bool) -> f64 {
        self.vias
            .iter()
            .filter(|v| v.cheap == cheap)
            .map(|v| v.cost)
            .fold(f64::INFINITY, f64::min)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetClass {
    pub id: NetClassId,
    pub name: String,
    pub trace_half_width: Vec<i64>,
    pub trace_clearance_class: ClearanceClass,
    pub via_rule: ViaRule,
    pub active_layers: Vec<bool>,
    pub shove_fix: bool,
    pub pull_tight: bool,
    pub length_min: Option<i64>,
    pub length_max: Option<i64>,
}

impl NetClass {
    pub fn is_layer_active(&self, layer: LayerId) -> bool {
        self.active_layers.get(layer as usize).copied().unwrap_or(false)
    }

    pub fn half_width(&self, layer: LayerId) -> i64 {
        self.trace_half_width.get(layer as usize).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clearance_evens_odd_inputs() {
        let mut m = ClearanceMatrix::new(2, 1);
        m.set_value(0, 1, 0, 199);
        assert_eq!(m.get_value(0, 1, 0), 200);
        assert_eq!(m.get_value(1, 0, 0), 200);
    }

    #[test]
    fn test_compensation_is_half_rounded_up() {
        let mut m = ClearanceMatrix::new(1, 1);
        m.set_value(0, 0, 0, 201);
        assert_eq!(m.get_value(0, 0, 0), 202);
        assert_eq!(m.compensation(0, 0), 101);
    }

    #[test]
    fn test_via_rule_preference_order() {
        let rule = ViaRule {
            vias: vec![
                ViaDef { radius: 12.5, layer_lo: 0, layer_hi: 1, cost: 50.0, cheap: false },
                ViaDef { radius: 12.5, layer_lo: 0, layer_hi: 2, cost: 80.0, cheap: false },
            ],
        };
        let v = rule.preferred_for_span(0, 1).unwrap();
        assert_eq!(v.cost, 50.0);
        assert_eq!(rule.preferred_for_span(1, 2), None);
    }
}
