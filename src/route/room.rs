use std::collections::HashMap;

use log::warn;

use crate::board::{Item, ItemId, LayerId, NetId, ViaRule};
use crate::geom::ConvexTile;
use crate::route::door::DoorId;
use crate::route::drill::DrillPageCache;

pub type RoomId = usize;

/// Obstacle-intersection checks during restraining give up after this many
/// iterations rather than looping forever on a degenerate input; logged as
/// a resource-exhaustion warning per §7.
const MAX_RESTRAIN_ITERS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// `set_shape`/`set_contained_shape` only: no id, not indexed, no doors.
    Incomplete,
    /// Shape frozen, doors calculable.
    Complete,
    /// Complete, but overlapped a net-dependent obstacle at generation time
    /// -- discarded rather than reused when routing a different net.
    NetDependent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomKind {
    FreeSpace,
    /// Wraps an item that may be shoved/ripped; its shape is the item's
    /// inflated shape.
    Obstacle(ItemId),
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub layer: LayerId,
    pub kind: RoomKind,
    pub state: RoomState,
    pub shape: ConvexTile,
    pub contained: ConvexTile,
    pub doors: Vec<DoorId>,
}

impl Room {
    pub fn new_incomplete(layer: LayerId, kind: RoomKind, shape: ConvexTile, contained: ConvexTile) -> Self {
        Self { id: 0, layer, kind, state: RoomState::Incomplete, shape, contained, doors: Vec::new() }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, RoomState::Complete | RoomState::NetDependent)
    }
}

/// Queries obstacles on `layer` overlapping `shape`'s bounding box, for the
/// restraining algorithm. A thin seam so `restrain` doesn't need to know
/// about `Board` directly.
pub trait ObstacleSource {
    fn obstacles_near(&self, shape: &ConvexTile, layer: LayerId) -> Vec<ObstacleShape>;
}

#[derive(Debug, Clone)]
pub struct ObstacleShape {
    pub item: ItemId,
    pub shape: ConvexTile,
    /// Obstacles overlapping a net-dependent area (a conduction area or
    /// keep-out scoped to a specific net) force the resulting room to
    /// `RoomState::NetDependent`.
    pub net_dependent: bool,
}

/// Iteratively cuts `shape` by half-planes derived from obstacle edges
/// until it is convex and obstacle-free on `layer`, keeping `contained`
/// inside throughout (§4.4). Returns the restrained shape and whether any
/// net-dependent obstacle was involved.
pub fn restrain(
    mut shape: ConvexTile,
    contained: &ConvexTile,
    layer: LayerId,
    obstacles: &impl ObstacleSource,
) -> (ConvexTile, bool) {
    let mut net_dependent = false;
    for _ in 0..MAX_RESTRAIN_ITERS {
        if shape.is_empty() {
            break;
        }
        let candidates = obstacles.obstacles_near(&shape, layer);
        let mut best: Option<(f64, crate::geom::Line)> = None;
        for obstacle in &candidates {
            if shape.intersection(&obstacle.shape).dimension() != 2 {
                continue;
            }
            if obstacle.net_dependent {
                net_dependent = true;
            }
            for i in 0..obstacle.shape.border_line_count() {
                // Obstacle on the line's right: the opposite of the
                // standard CCW (interior-on-left) border line.
                let e = obstacle.shape.border_line(i).opposite();
                if !shape.intersects_interior(&e) {
                    continue;
                }
                if contained.distance_to_left_of(&e) <= 0.0 {
                    continue;
                }
                let dist = contained.distance_to_left_of(&e);
                if best.as_ref().is_none_or(|(d, _)| dist > *d) {
                    best = Some((dist, e));
                }
            }
        }
        match best {
            None => return (shape, net_dependent),
            Some((_, cut)) => shape = shape.intersect_with_half_plane(&cut),
        }
    }
    if !shape.is_empty() {
        warn!("room restraining did not converge within {MAX_RESTRAIN_ITERS} iterations");
    }
    (shape, net_dependent)
}

/// Board-backed implementation of [`ObstacleSource`].
pub struct BoardObstacles<'a> {
    pub board: &'a crate::board::Board,
    pub exempt_nets: &'a [NetId],
    /// Clearance + half-width to inflate an obstacle by, for the layer it's
    /// being viewed from -- both vary per layer, so the query layer is
    /// passed through rather than fixed at construction time.
    pub compensation: Box<dyn Fn(&Item, LayerId) -> i64 + 'a>,
}

impl ObstacleSource for BoardObstacles<'_> {
    fn obstacles_near(&self, shape: &ConvexTile, layer: LayerId) -> Vec<ObstacleShape> {
        let bbox = shape.bounding_box();
        self.board
            .obstacles_in(&bbox, layer, self.exempt_nets)
            .into_iter()
            .map(|item| ObstacleShape {
                item: item.id(),
                shape: item.inflated_shape((self.compensation)(item, layer)),
                net_dependent: false,
            })
            .collect()
    }
}

/// The room/door graph built for a single connection attempt.
pub struct ConnectionGraph {
    pub rooms: Vec<Room>,
    pub doors: Vec<Door>,
    pub start_room: RoomId,
}

/// Builds the graph a [`crate::route::maze::MazeSearch`] runs over: restrain
/// `universe` to the free-space fragment containing `start` and `dest` on
/// each of the net's active layers (§4.4), wrap each obstacle a fragment's
/// border touches in its own obstacle room with a door back to it (so
/// rip-up can still reach past it), link same-position free-space fragments
/// on layer pairs the net's via rule can span with drill doors (§4.6 point
/// 5), and add a target door at `dest` on every layer its own span covers.
/// This is a single-shot decomposition rather than the full recursive room
/// expansion a mature router performs past every cut edge; it is enough to
/// route within one free-space pocket per layer plus the vias connecting
/// them, and is the scope this crate's pass controller relies on.
#[allow(clippy::too_many_arguments)]
pub fn build_connection_graph(
    universe: ConvexTile,
    active_layers: &[LayerId],
    via_rule: &ViaRule,
    start: crate::geom::Pt,
    start_layer: LayerId,
    dest: crate::geom::Pt,
    dest_span: (LayerId, LayerId),
    dest_item: ItemId,
    obstacles: &impl ObstacleSource,
) -> ConnectionGraph {
    use crate::route::door::Door;

    let contained = ConvexTile::Segment(start, dest);
    let mut rooms: Vec<Room> = Vec::new();
    let mut doors: Vec<Door> = Vec::new();
    let mut free_room_of: HashMap<LayerId, RoomId> = HashMap::new();

    for &layer in active_layers {
        let (shape, net_dependent) = restrain(universe.clone(), &contained, layer, obstacles);
        let room_id = rooms.len();
        let mut free_room = Room::new_incomplete(layer, RoomKind::FreeSpace, shape.clone(), contained.clone());
        free_room.id = room_id;
        free_room.state = if net_dependent { RoomState::NetDependent } else { RoomState::Complete };
        rooms.push(free_room);
        free_room_of.insert(layer, room_id);

        for candidate in obstacles.obstacles_near(&shape, layer) {
            if shape.touching_sides(&candidate.shape).is_none() {
                continue;
            }
            let obstacle_room_id = rooms.len();
            let mut obstacle_room =
                Room::new_incomplete(layer, RoomKind::Obstacle(candidate.item), candidate.shape.clone(), candidate.shape.clone());
            obstacle_room.id = obstacle_room_id;
            obstacle_room.state = RoomState::Complete;

            let door_shape = shape.intersection(&candidate.shape);
            let door_id = doors.len();
            let mut door = Door::new_normal(room_id, obstacle_room_id, door_shape);
            door.id = door_id;
            rooms[room_id].doors.push(door_id);
            obstacle_room.doors.push(door_id);
            doors.push(door);
            rooms.push(obstacle_room);
        }

        if layer >= dest_span.0 && layer <= dest_span.1 {
            let dest_door_id = doors.len();
            let mut dest_door = Door::new_target(room_id, dest_item, ConvexTile::Point(dest));
            dest_door.id = dest_door_id;
            rooms[room_id].doors.push(dest_door_id);
            doors.push(dest_door);
        }
    }

    add_drill_doors(&mut rooms, &mut doors, active_layers, via_rule, &free_room_of);

    let start_room = free_room_of.get(&start_layer).copied().unwrap_or(0);
    ConnectionGraph { rooms, doors, start_room }
}

/// Links every pair of active layers the via rule can span with drill doors
/// between their free-space rooms, at sites drawn from a per-pair
/// [`DrillPageCache`] page generated over the area free on both layers.
/// This is what lets the maze search reach a layer its start/target doors
/// don't already sit on (§4.6 point 5): without it every free-space room is
/// an isolated island per layer.
fn add_drill_doors(
    rooms: &mut Vec<Room>,
    doors: &mut Vec<crate::route::door::Door>,
    active_layers: &[LayerId],
    via_rule: &ViaRule,
    free_room_of: &HashMap<LayerId, RoomId>,
) {
    use crate::route::door::Door;

    let mut drill_cache = DrillPageCache::new();
    for i in 0..active_layers.len() {
        for j in (i + 1)..active_layers.len() {
            let (lo, hi) = (active_layers[i], active_layers[j]);
            if via_rule.preferred_for_span(lo, hi).is_none() {
                continue;
            }
            let (Some(&lo_room), Some(&hi_room)) = (free_room_of.get(&lo), free_room_of.get(&hi)) else { continue };
            let via_area = rooms[lo_room].shape.intersection(&rooms[hi_room].shape);
            if via_area.is_empty() {
                continue;
            }
            let sites = drill_cache.page(lo_room, lo, hi).sites(&via_area).to_vec();
            for site in sites {
                let door_id = doors.len();
                let mut door = Door::new_drill(lo_room, hi_room, site.point, lo, hi, ConvexTile::Point(site.point.to_pt()));
                door.id = door_id;
                rooms[lo_room].doors.push(door_id);
                rooms[hi_room].doors.push(door_id);
                doors.push(door);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Pt;

    struct FixedObstacles(Vec<ObstacleShape>);
    impl ObstacleSource for FixedObstacles {
        fn obstacles_near(&self, _shape: &ConvexTile, _layer: LayerId) -> Vec<ObstacleShape> {
            self.0.clone()
        }
    }

    #[test]
    fn test_restrain_cuts_around_single_obstacle() {
        let shape = ConvexTile::rect(Pt::new(0.0, 0.0), Pt::new(100.0, 100.0));
        let contained = ConvexTile::Point(Pt::new(10.0, 50.0));
        let obstacle = ObstacleShape {
            item: 1,
            shape: ConvexTile::rect(Pt::new(50.0, -10.0), Pt::new(60.0, 110.0)),
            net_dependent: false,
        };
        let obstacles = FixedObstacles(vec![obstacle.clone()]);
        let (restrained, net_dep) = restrain(shape, &contained, 0, &obstacles);
        assert!(!net_dep);
        assert!(restrained.contains(Pt::new(10.0, 50.0)));
        assert!(restrained.intersection(&obstacle.shape).is_empty() || restrained.intersection(&obstacle.shape).dimension() < 2);
    }

    #[test]
    fn test_restrain_no_obstacles_returns_input() {
        let shape = ConvexTile::rect(Pt::new(0.0, 0.0), Pt::new(100.0, 100.0));
        let contained = ConvexTile::Point(Pt::new(10.0, 50.0));
        let obstacles = FixedObstacles(vec![]);
        let (restrained, _) = restrain(shape.clone(), &contained, 0, &obstacles);
        assert_eq!(restrained, shape);
    }

    #[test]
    fn test_build_connection_graph_open_space_has_only_target_door() {
        let universe = ConvexTile::rect(Pt::new(0.0, 0.0), Pt::new(1000.0, 1000.0));
        let obstacles = FixedObstacles(vec![]);
        let graph =
            build_connection_graph(universe, &[0], &ViaRule::default(), Pt::new(10.0, 10.0), 0, Pt::new(500.0, 500.0), (0, 0), 42, &obstacles);
        assert_eq!(graph.rooms.len(), 1);
        assert_eq!(graph.doors.len(), 1);
        assert!(graph.doors[0].is_target());
    }

    #[test]
    fn test_build_connection_graph_adds_obstacle_room_when_touching() {
        let universe = ConvexTile::rect(Pt::new(0.0, 0.0), Pt::new(100.0, 100.0));
        let obstacle = ObstacleShape { item: 7, shape: ConvexTile::rect(Pt::new(50.0, -10.0), Pt::new(60.0, 110.0)), net_dependent: false };
        let obstacles = FixedObstacles(vec![obstacle]);
        let graph =
            build_connection_graph(universe, &[0], &ViaRule::default(), Pt::new(10.0, 50.0), 0, Pt::new(20.0, 60.0), (0, 0), 42, &obstacles);
        assert_eq!(graph.rooms.len(), 2);
        assert!(matches!(graph.rooms[1].kind, RoomKind::Obstacle(7)));
        assert_eq!(graph.doors.len(), 2);
    }

    #[test]
    fn test_build_connection_graph_links_layers_with_a_drill_door_when_via_fits() {
        use crate::board::ViaDef;

        let universe = ConvexTile::rect(Pt::new(0.0, 0.0), Pt::new(1000.0, 1000.0));
        let obstacles = FixedObstacles(vec![]);
        let via_rule = ViaRule { vias: vec![ViaDef { radius: 100.0, layer_lo: 0, layer_hi: 1, cost: 50.0, cheap: false }] };
        let graph =
            build_connection_graph(universe, &[0, 1], &via_rule, Pt::new(10.0, 10.0), 0, Pt::new(500.0, 500.0), (1, 1), 42, &obstacles);
        // One free room per layer, one target door on layer 1, and at least
        // one drill door linking them.
        assert_eq!(graph.rooms.iter().filter(|r| matches!(r.kind, RoomKind::FreeSpace)).count(), 2);
        assert!(graph.doors.iter().any(|d| d.is_drill()));
        assert!(graph.doors.iter().any(|d| d.is_target()));
    }

    #[test]
    fn test_build_connection_graph_no_drill_door_when_no_via_spans_the_layers() {
        let universe = ConvexTile::rect(Pt::new(0.0, 0.0), Pt::new(1000.0, 1000.0));
        let obstacles = FixedObstacles(vec![]);
        let graph = build_connection_graph(
            universe,
            &[0, 1],
            &ViaRule::default(),
            Pt::new(10.0, 10.0),
            0,
            Pt::new(500.0, 500.0),
            (1, 1),
            42,
            &obstacles,
        );
        assert!(!graph.doors.iter().any(|d| d.is_drill()));
    }
}
