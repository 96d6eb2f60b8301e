use crate::board::{LayerId, NetClass, NetId, ViaRule};
use crate::geom::Pt;

/// Per-layer horizontal/vertical trace cost factors (§4.11).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerCost {
    pub horizontal: f64,
    pub vertical: f64,
}

impl LayerCost {
    pub fn uniform(cost: f64) -> Self {
        Self { horizontal: cost, vertical: cost }
    }

    /// Axis-weighted cost factor for travel along `dir`.
    pub fn for_dir(&self, dir: Pt) -> f64 {
        let len = dir.mag();
        if len < 1e-9 {
            return self.horizontal.min(self.vertical);
        }
        let wx = dir.x.abs() / len;
        let wy = dir.y.abs() / len;
        wx * self.horizontal + wy * self.vertical
    }

    pub fn min(&self) -> f64 {
        self.horizontal.min(self.vertical)
    }
}

/// Per-net, per-pass control block driving the maze search and cost model
/// (§4.11). Built fresh for each connection attempt by the pass controller.
#[derive(Debug, Clone)]
pub struct Control {
    pub net: NetId,
    pub trace_costs: Vec<LayerCost>,
    pub layer_active: Vec<bool>,
    pub trace_half_width: Vec<i64>,
    pub compensated_half_width: Vec<i64>,
    pub via_rule: ViaRule,
    pub min_normal_via_cost: f64,
    pub min_cheap_via_cost: f64,
    pub vias_allowed: bool,
    pub attach_smd_allowed: bool,
    pub with_neckdown: bool,
    pub ripup_allowed: bool,
    pub ripup_cost_limit: f64,
    pub ripup_pass_no: u32,
    pub ripup_cap_per_item: u32,
    pub push_and_shove_enabled: bool,
    pub max_iterations: u64,
    pub max_shove_trace_recursion: u32,
    pub max_shove_via_recursion: u32,
    pub max_shove_spring_recursion: u32,
    pub via_lower_bound: LayerId,
    pub via_upper_bound: LayerId,
    pub max_via_radius: i64,
    pub bend_penalty: f64,
}

impl Control {
    /// Default policy of §4.11: rip-up enabled with a ~10-trace-deletion
    /// starting budget, via radius 25 units, 100,000 max iterations, and
    /// shove recursion depths 15/5/10 (shove itself is unimplemented, see
    /// §9 Open Questions; the depths are retained as dormant config).
    pub fn from_net_class(net: NetId, class: &NetClass, n_layer: usize, ripup_cost_limit: f64, ripup_pass_no: u32) -> Self {
        let trace_costs = (0..n_layer).map(|_| LayerCost::uniform(1.0)).collect();
        let layer_active = (0..n_layer).map(|l| class.is_layer_active(l as LayerId)).collect();
        let trace_half_width: Vec<i64> = (0..n_layer).map(|l| class.half_width(l as LayerId)).collect();
        let compensated_half_width = trace_half_width.clone();
        let min_normal_via_cost = class.via_rule.min_cost(false);
        let min_cheap_via_cost = class.via_rule.min_cost(true);
        Self {
            net,
            trace_costs,
            layer_active,
            trace_half_width,
            compensated_half_width,
            via_rule: class.via_rule.clone(),
            min_normal_via_cost: if min_normal_via_cost.is_finite() { min_normal_via_cost } else { 0.0 },
            min_cheap_via_cost: if min_cheap_via_cost.is_finite() { min_cheap_via_cost } else { 0.0 },
            vias_allowed: true,
            attach_smd_allowed: false,
            with_neckdown: false,
            ripup_allowed: true,
            ripup_cost_limit,
            ripup_pass_no,
            ripup_cap_per_item: 3,
            push_and_shove_enabled: false,
            max_iterations: 100_000,
            max_shove_trace_recursion: 15,
            max_shove_via_recursion: 5,
            max_shove_spring_recursion: 10,
            via_lower_bound: 0,
            via_upper_bound: n_layer.saturating_sub(1) as LayerId,
            max_via_radius: 25,
            bend_penalty: 0.5,
        }
    }

    pub fn trace_cost(&self, layer: LayerId, dir: Pt, length: f64) -> f64 {
        self.trace_costs[layer as usize].for_dir(dir) * length
    }

    pub fn bend_cost(&self, prev_dir: Option<Pt>, new_dir: Pt) -> f64 {
        match prev_dir {
            None => 0.0,
            Some(prev) => {
                let pn = prev.norm();
                let nn = new_dir.norm();
                if (pn - nn).mag2() < 1e-9 { 0.0 } else { self.bend_penalty }
            }
        }
    }

    pub fn via_cost(&self, lo: LayerId, hi: LayerId) -> Option<f64> {
        self.via_rule.preferred_for_span(lo, hi).map(|v| v.cost)
    }

    /// Minimum via cost the heuristic may assume, over normal and cheap
    /// variants -- an admissibility floor, never the actual path's via
    /// cost.
    pub fn min_via_cost_floor(&self) -> f64 {
        self.min_normal_via_cost.min(self.min_cheap_via_cost)
    }

    /// Rip-up cost for deleting `item`, escalated by pass number and a
    /// per-clearance-class multiplier (§4.6.2).
    pub fn ripup_cost(&self, base_cost: f64, class_multiplier: f64, escalation_per_pass: f64) -> f64 {
        base_cost * class_multiplier * (1.0 + self.ripup_pass_no as f64 * escalation_per_pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_cost_axis_weighting() {
        let c = LayerCost { horizontal: 1.0, vertical: 2.0 };
        assert!((c.for_dir(Pt::new(1.0, 0.0)) - 1.0).abs() < 1e-9);
        assert!((c.for_dir(Pt::new(0.0, 1.0)) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_bend_cost_zero_at_start_and_on_straight() {
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
        let c = Control::from_net_class(1, &class, 2, 100.0, 0);
        assert_eq!(c.bend_cost(None, Pt::new(1.0, 0.0)), 0.0);
        assert_eq!(c.bend_cost(Some(Pt::new(1.0, 0.0)), Pt::new(2.0, 0.0)), 0.0);
        assert_eq!(c.bend_cost(Some(Pt::new(1.0, 0.0)), Pt::new(0.0, 1.0)), c.bend_penalty);
    }

    #[test]
    fn test_ripup_cost_escalates_with_pass() {
        let class = NetClass {
            id: 0,
            name: "default".into(),
            trace_half_width: vec![150],
            trace_clearance_class: 0,
            via_rule: ViaRule::default(),
            active_layers: vec![true],
            shove_fix: false,
            pull_tight: false,
            length_min: None,
            length_max: None,
        };
        let c0 = Control::from_net_class(1, &class, 1, 100.0, 0);
        let c2 = Control::from_net_class(1, &class, 1, 100.0, 2);
        assert!(c2.ripup_cost(10.0, 1.0, 0.5) > c0.ripup_cost(10.0, 1.0, 0.5));
    }
}
