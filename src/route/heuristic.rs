use crate::board::layer::LayerId;
use crate::geom::Pt;
use crate::route::cost::Control;

/// One destination the heuristic estimates distance to: a point on a
/// specific layer (a door section's shape reduced to a representative
/// point, or a target item's center).
#[derive(Debug, Clone, Copy)]
pub struct TargetPoint {
    pub point: Pt,
    pub layer: LayerId,
}

/// Admissible destination-distance heuristic (§4.5): never overestimates
/// the true remaining cost, so the maze search stays optimal. For each
/// candidate target it takes straight-line distance scaled by the cheapest
/// possible trace cost factor over any active layer, plus one via-cost
/// floor if a layer (or board side) change is unavoidable, and returns the
/// minimum over all targets.
pub struct Heuristic<'a> {
    control: &'a Control,
    targets: Vec<TargetPoint>,
    min_trace_cost: f64,
}

impl<'a> Heuristic<'a> {
    pub fn new(control: &'a Control, targets: Vec<TargetPoint>) -> Self {
        let min_trace_cost = control
            .trace_costs
            .iter()
            .enumerate()
            .filter(|(l, _)| control.layer_active.get(*l).copied().unwrap_or(false))
            .map(|(_, c)| c.min())
            .fold(f64::INFINITY, f64::min);
        let min_trace_cost = if min_trace_cost.is_finite() { min_trace_cost } else { 0.0 };
        Self { control, targets, min_trace_cost }
    }

    /// Lower bound on the remaining cost to reach any target from `(point,
    /// layer)`. Returns `f64::INFINITY` if there are no targets (caller
    /// should never expand past the goal-finding check in that state).
    pub fn estimate(&self, point: Pt, layer: LayerId) -> f64 {
        self.targets
            .iter()
            .map(|t| self.estimate_to(point, layer, t))
            .fold(f64::INFINITY, f64::min)
    }

    fn estimate_to(&self, point: Pt, layer: LayerId, target: &TargetPoint) -> f64 {
        let dist = point.dist(target.point) * self.min_trace_cost;
        if layer == target.layer {
            return dist;
        }
        // A layer change is unavoidable, and one via is always enough to
        // reach any other layer regardless of board side, so one via-cost
        // floor is a safe (admissible) lower bound either way.
        dist + self.control.min_via_cost_floor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{NetClass, ViaRule};

    fn control() -> Control {
        let class = NetClass {
            id: 0,
            name: "default".into(),
            trace_half_width: vec![150, 150],
            trace_clearance_class: 0,
            via_rule: ViaRule::default(),
            active_layers: vec![true, true],
            shove_fix: false,
            pull_tight: false,
            length_min: None,
            length_max: None,
        };
        Control::from_net_class(1, &class, 2, 100.0, 0)
    }

    #[test]
    fn test_same_layer_is_pure_distance() {
        let c = control();
        let targets = vec![TargetPoint { point: Pt::new(100.0, 0.0), layer: 0 }];
        let h = Heuristic::new(&c, targets);
        assert!((h.estimate(Pt::new(0.0, 0.0), 0) - 100.0 * h.min_trace_cost).abs() < 1e-9);
    }

    #[test]
    fn test_layer_change_adds_via_floor_and_stays_admissible() {
        let c = control();
        let targets = vec![TargetPoint { point: Pt::new(100.0, 0.0), layer: 1 }];
        let h = Heuristic::new(&c, targets);
        let same_layer = Heuristic::new(&c, vec![TargetPoint { point: Pt::new(100.0, 0.0), layer: 0 }]);
        assert!(h.estimate(Pt::new(0.0, 0.0), 0) >= same_layer.estimate(Pt::new(0.0, 0.0), 0));
    }

    #[test]
    fn test_no_targets_is_infinite() {
        let c = control();
        let h = Heuristic::new(&c, vec![]);
        assert_eq!(h.estimate(Pt::new(0.0, 0.0), 0), f64::INFINITY);
    }
}
