use crate::board::{ItemId, NetId};
use crate::geom::Pt;
use crate::route::maze::PathPoint;

pub type ConnectionId = u64;

/// A two-endpoint connection the pass controller must route, pre-computed
/// from incomplete-connection discovery (§4.8) before any maze search runs.
/// Carries the straight-line distance so a finished (or attempted) route
/// can be scored against an ideal lower bound (§4.7).
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub net: NetId,
    pub from_item: ItemId,
    pub to_item: ItemId,
    pub from_point: Pt,
    pub to_point: Pt,
}

impl Connection {
    pub fn new(id: ConnectionId, net: NetId, from_item: ItemId, to_item: ItemId, from_point: Pt, to_point: Pt) -> Self {
        Self { id, net, from_item, to_item, from_point, to_point }
    }

    pub fn straight_line_distance(&self) -> f64 {
        self.from_point.dist(self.to_point)
    }

    /// Ratio of actual routed length to straight-line distance: 1.0 is a
    /// perfectly direct route, higher values flag connections worth
    /// re-routing in a later pass once more of the board has settled.
    pub fn detour_ratio(&self, path: &[PathPoint]) -> f64 {
        let straight = self.straight_line_distance();
        if straight < 1e-9 {
            return 1.0;
        }
        path_length(path) / straight
    }
}

/// Sum of segment lengths between consecutive path points, including a
/// zero-length "hop" at a layer change (the via/drill's own cost is
/// accounted for separately in [`crate::route::cost::Control::via_cost`]).
pub fn path_length(path: &[PathPoint]) -> f64 {
    path.windows(2).map(|w| w[0].point.dist(w[1].point)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::LayerId;

    fn pp(x: f64, y: f64, layer: LayerId) -> PathPoint {
        PathPoint { point: Pt::new(x, y), layer }
    }

    #[test]
    fn test_straight_line_distance() {
        let c = Connection::new(1, 1, 10, 11, Pt::new(0.0, 0.0), Pt::new(3.0, 4.0));
        assert_eq!(c.straight_line_distance(), 5.0);
    }

    #[test]
    fn test_detour_ratio_direct_path_is_one() {
        let c = Connection::new(1, 1, 10, 11, Pt::new(0.0, 0.0), Pt::new(10.0, 0.0));
        let path = vec![pp(0.0, 0.0, 0), pp(10.0, 0.0, 0)];
        assert!((c.detour_ratio(&path) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_detour_ratio_bent_path_exceeds_one() {
        let c = Connection::new(1, 1, 10, 11, Pt::new(0.0, 0.0), Pt::new(10.0, 0.0));
        let path = vec![pp(0.0, 0.0, 0), pp(5.0, 5.0, 0), pp(10.0, 0.0, 0)];
        assert!(c.detour_ratio(&path) > 1.0);
    }
}
