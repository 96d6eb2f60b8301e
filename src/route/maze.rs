use std::cmp::Reverse;
use std::collections::HashMap;

use log::warn;
use ordered_float::OrderedFloat;
use priority_queue::PriorityQueue;

use crate::board::{ItemId, LayerId};
use crate::geom::Pt;
use crate::route::cost::Control;
use crate::route::door::{Door, DoorId};
use crate::route::heuristic::Heuristic;
use crate::route::room::{Room, RoomId, RoomKind};
use crate::route::stop::{Deadline, StopToken};

/// Flat per-rip-up-step cost; escalated per pass by [`Control::ripup_cost`].
const RIPUP_BASE_COST: f64 = 50.0;
const RIPUP_CLASS_MULTIPLIER: f64 = 1.0;
const RIPUP_ESCALATION_PER_PASS: f64 = 0.5;

/// Result of a completed [`MazeSearch::run`] (§4.6.3). `Stopped`/`TimedOut`
/// are reported distinctly from `NotFound` per §6/§7 -- cancellation is not
/// a routing failure.
#[derive(Debug, Clone)]
pub enum MazeOutcome {
    Found(MazeSearchResult),
    NotFound,
    Stopped,
    TimedOut,
}

/// A point on the path this search returns, with the layer it was reached
/// on (changes only at a drill/via crossing).
#[derive(Debug, Clone, Copy)]
pub struct PathPoint {
    pub point: Pt,
    pub layer: LayerId,
}

#[derive(Debug, Clone)]
pub struct MazeSearchResult {
    pub path: Vec<PathPoint>,
    pub cost: f64,
    /// Items whose owning obstacle room the winning path crossed through;
    /// the pass controller rips these up before inserting the new trace.
    pub ripup_items: Vec<ItemId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ExpansionKey {
    door: DoorId,
    section: usize,
    /// Room entered by crossing `door`'s `section`, as seen from wherever
    /// the search currently stands. Disambiguates "which side of the door"
    /// without needing a separate visited-room stack.
    into_room: RoomId,
}

/// Drives one connection's `MazeExpansionList`-style search (§4.6):
/// maintains the frontier as a min-priority-queue of door sections keyed by
/// `f = g + h`, occupies sections as they're popped, and stops at the first
/// target door reached. Rooms/doors are arena-indexed rather than linked by
/// pointer, per the rest of the board model.
pub struct MazeSearch<'a> {
    rooms: &'a [Room],
    doors: &'a mut [Door],
    control: &'a Control,
    heuristic: Heuristic<'a>,
    start_point: Pt,
    start_layer: LayerId,
    queue: PriorityQueue<ExpansionKey, Reverse<OrderedFloat<f64>>>,
    ripup_counts: HashMap<ItemId, u32>,
    iterations: u64,
}

impl<'a> MazeSearch<'a> {
    pub fn new(
        rooms: &'a [Room],
        doors: &'a mut [Door],
        control: &'a Control,
        heuristic: Heuristic<'a>,
        start_room: RoomId,
        start_point: Pt,
        start_layer: LayerId,
    ) -> Self {
        for door in doors.iter_mut() {
            door.reset();
        }
        let mut search = Self {
            rooms,
            doors,
            control,
            heuristic,
            start_point,
            start_layer,
            queue: PriorityQueue::new(),
            ripup_counts: HashMap::new(),
            iterations: 0,
        };
        search.seed(start_room);
        search
    }

    fn seed(&mut self, start_room: RoomId) {
        let door_ids = self.rooms[start_room].doors.clone();
        for door_id in door_ids {
            let into_room = self.doors[door_id].other_room(start_room);
            let ripup_extra = self.ripup_extra(into_room);
            let n_sections = self.doors[door_id].sections.len();
            for section in 0..n_sections {
                let Some(p) = representative_point(&self.doors[door_id].sections[section].shape) else { continue };
                let Some((step, via_ripup)) = ripup_extra.map(|extra| {
                    let dir = p - self.start_point;
                    (self.control.trace_cost(self.start_layer, dir, dir.mag()) + extra, extra > 0.0)
                }) else {
                    continue;
                };
                self.try_push(ExpansionKey { door: door_id, section, into_room }, step, None, via_ripup);
            }
        }
    }

    /// Runs the search to completion (or exhaustion), returning the
    /// cheapest path to a target door, if any. Checks `stop` and `deadline`
    /// before popping each element (§5) -- a triggered stop or deadline
    /// leaves the board untouched for this connection.
    pub fn run(&mut self, stop: &StopToken, deadline: Deadline) -> MazeOutcome {
        if deadline.elapsed() {
            return MazeOutcome::TimedOut;
        }
        if stop.is_stopped() {
            return MazeOutcome::Stopped;
        }
        while let Some((key, _)) = self.queue.pop() {
            self.iterations += 1;
            if deadline.elapsed() {
                return MazeOutcome::TimedOut;
            }
            if stop.is_stopped() {
                return MazeOutcome::Stopped;
            }
            if self.iterations > self.control.max_iterations {
                warn!("maze search exceeded {} iterations without finding a target", self.control.max_iterations);
                return MazeOutcome::NotFound;
            }
            if self.doors[key.door].sections[key.section].element.occupied {
                continue;
            }
            self.doors[key.door].sections[key.section].element.occupied = true;
            if self.doors[key.door].is_target() {
                return MazeOutcome::Found(self.reconstruct(key));
            }
            self.expand(key);
        }
        MazeOutcome::NotFound
    }

    fn expand(&mut self, key: ExpansionKey) {
        let from_layer = self.rooms[key.into_room].layer;
        let Some(from_point) = representative_point(&self.doors[key.door].sections[key.section].shape) else { return };
        let g = self.doors[key.door].sections[key.section].element.g;
        let prev_dir = self.prev_dir(key);
        let door_ids = self.rooms[key.into_room].doors.clone();
        for door_id in door_ids {
            if door_id == key.door {
                continue;
            }
            let next_room = self.doors[door_id].other_room(key.into_room);
            let to_layer = self.rooms[next_room].layer;
            let Some(ripup_extra) = self.ripup_extra(next_room) else { continue };
            let n_sections = self.doors[door_id].sections.len();
            for section in 0..n_sections {
                let Some(to_point) = representative_point(&self.doors[door_id].sections[section].shape) else { continue };
                let Some(step) = self.step_cost(from_point, from_layer, to_point, to_layer, prev_dir) else { continue };
                let g2 = g + step + ripup_extra;
                self.try_push(
                    ExpansionKey { door: door_id, section, into_room: next_room },
                    g2,
                    Some((key.door, key.section)),
                    ripup_extra > 0.0,
                );
            }
        }
    }

    fn prev_dir(&self, key: ExpansionKey) -> Option<Pt> {
        let el = &self.doors[key.door].sections[key.section].element;
        let back_door = el.back_door?;
        let from = representative_point(&self.doors[back_door].sections[el.back_section].shape)?;
        let to = representative_point(&self.doors[key.door].sections[key.section].shape)?;
        Some(to - from)
    }

    fn step_cost(&self, from: Pt, from_layer: LayerId, to: Pt, to_layer: LayerId, prev_dir: Option<Pt>) -> Option<f64> {
        if from_layer == to_layer {
            let dir = to - from;
            let trace = self.control.trace_cost(from_layer, dir, dir.mag());
            let bend = self.control.bend_cost(prev_dir, dir);
            Some(trace + bend)
        } else {
            let (lo, hi) = if from_layer < to_layer { (from_layer, to_layer) } else { (to_layer, from_layer) };
            self.control.via_cost(lo, hi)
        }
    }

    /// `Some(extra_cost)` if `room` may be entered (free space costs
    /// nothing extra; an obstacle room costs a rip-up penalty, capped per
    /// item), `None` if entry is forbidden outright.
    fn ripup_extra(&self, room: RoomId) -> Option<f64> {
        match self.rooms[room].kind {
            RoomKind::FreeSpace => Some(0.0),
            RoomKind::Obstacle(item) => {
                if !self.control.ripup_allowed {
                    return None;
                }
                let count = self.ripup_counts.get(&item).copied().unwrap_or(0);
                if count >= self.control.ripup_cap_per_item {
                    return None;
                }
                let cost = self.control.ripup_cost(RIPUP_BASE_COST, RIPUP_CLASS_MULTIPLIER, RIPUP_ESCALATION_PER_PASS);
                if cost > self.control.ripup_cost_limit {
                    return None;
                }
                Some(cost)
            }
        }
    }

    fn try_push(&mut self, key: ExpansionKey, g: f64, back: Option<(DoorId, usize)>, via_ripup: bool) {
        let point = representative_point(&self.doors[key.door].sections[key.section].shape).unwrap_or(Pt::zero());
        let layer = self.rooms[key.into_room].layer;
        let section = &mut self.doors[key.door].sections[key.section];
        if section.element.occupied || g >= section.element.g {
            return;
        }
        section.element.g = g;
        section.element.back_door = back.map(|(d, _)| d);
        section.element.back_section = back.map(|(_, s)| s).unwrap_or(0);
        section.element.via_ripup = via_ripup;
        let h = self.heuristic.estimate(point, layer);
        self.queue.push(key, Reverse(OrderedFloat(g + h)));
    }

    fn reconstruct(&mut self, key: ExpansionKey) -> MazeSearchResult {
        let mut path = Vec::new();
        let mut ripup_items = Vec::new();
        let mut cur = Some(key);
        let total_cost = self.doors[key.door].sections[key.section].element.g;
        while let Some(k) = cur {
            let layer = self.rooms[k.into_room].layer;
            if let RoomKind::Obstacle(item) = self.rooms[k.into_room].kind {
                if self.doors[k.door].sections[k.section].element.via_ripup {
                    ripup_items.push(item);
                    *self.ripup_counts.entry(item).or_insert(0) += 1;
                }
            }
            let Some(point) = representative_point(&self.doors[k.door].sections[k.section].shape) else { break };
            path.push(PathPoint { point, layer });
            let el = &self.doors[k.door].sections[k.section].element;
            cur = el.back_door.map(|bd| {
                let prev_room = self.doors[k.door].other_room(k.into_room);
                ExpansionKey { door: bd, section: el.back_section, into_room: prev_room }
            });
        }
        path.push(PathPoint { point: self.start_point, layer: self.start_layer });
        path.reverse();
        ripup_items.reverse();
        MazeSearchResult { path, cost: total_cost, ripup_items }
    }
}

fn representative_point(shape: &crate::geom::ConvexTile) -> Option<Pt> {
    use crate::geom::ConvexTile;
    match shape {
        ConvexTile::Empty => None,
        ConvexTile::Point(p) => Some(*p),
        ConvexTile::Segment(a, b) => Some(a.lerp(*b, 0.5)),
        ConvexTile::Polygon(pts) => {
            let n = pts.len() as f64;
            Some(pts.iter().fold(Pt::zero(), |acc, p| acc + *p) * (1.0 / n))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{NetClass, ViaRule};
    use crate::geom::ConvexTile;
    use crate::route::door::{Door, DoorKind};
    use crate::route::heuristic::TargetPoint;
    use crate::route::room::{Room, RoomState};

    fn control() -> Control {
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
        Control::from_net_class(1, &class, 1, 1000.0, 0)
    }

    /// start room(0) -- door0 --> mid room(1) -- door1(target) --> (sink)
    fn two_hop_rooms_and_doors() -> (Vec<Room>, Vec<Door>) {
        let room0 = Room { id: 0, layer: 0, kind: RoomKind::FreeSpace, state: RoomState::Complete, shape: ConvexTile::Empty, contained: ConvexTile::Empty, doors: vec![0] };
        let room1 = Room { id: 1, layer: 0, kind: RoomKind::FreeSpace, state: RoomState::Complete, shape: ConvexTile::Empty, contained: ConvexTile::Empty, doors: vec![0, 1] };
        let mut door0 = Door::new_normal(0, 1, ConvexTile::Segment(Pt::new(100.0, 0.0), Pt::new(100.0, 10.0)));
        door0.id = 0;
        let mut door1 = Door { id: 1, room_a: 1, room_b: 1, kind: DoorKind::Target(99), sections: vec![crate::route::door::DoorSection::new(ConvexTile::Point(Pt::new(200.0, 0.0)))] };
        door1.id = 1;
        (vec![room0, room1], vec![door0, door1])
    }

    #[test]
    fn test_finds_path_to_target_door() {
        let c = control();
        let (rooms, mut doors) = two_hop_rooms_and_doors();
        let targets = vec![TargetPoint { point: Pt::new(200.0, 0.0), layer: 0 }];
        let heuristic = Heuristic::new(&c, targets);
        let mut search = MazeSearch::new(&rooms, &mut doors, &c, heuristic, 0, Pt::new(0.0, 0.0), 0);
        let outcome = search.run(&StopToken::new(), Deadline::none());
        let result = match outcome {
            MazeOutcome::Found(r) => r,
            _ => panic!("path should be found"),
        };
        assert!(result.path.len() >= 2);
        assert!(result.ripup_items.is_empty());
        assert!(result.cost > 0.0);
    }

    #[test]
    fn test_unreachable_target_returns_not_found() {
        let c = control();
        let room0 = Room { id: 0, layer: 0, kind: RoomKind::FreeSpace, state: RoomState::Complete, shape: ConvexTile::Empty, contained: ConvexTile::Empty, doors: vec![] };
        let rooms = vec![room0];
        let mut doors: Vec<Door> = vec![];
        let targets = vec![TargetPoint { point: Pt::new(200.0, 0.0), layer: 0 }];
        let heuristic = Heuristic::new(&c, targets);
        let mut search = MazeSearch::new(&rooms, &mut doors, &c, heuristic, 0, Pt::new(0.0, 0.0), 0);
        assert!(matches!(search.run(&StopToken::new(), Deadline::none()), MazeOutcome::NotFound));
    }

    #[test]
    fn test_expired_deadline_stops_before_popping() {
        let c = control();
        let (rooms, mut doors) = two_hop_rooms_and_doors();
        let targets = vec![TargetPoint { point: Pt::new(200.0, 0.0), layer: 0 }];
        let heuristic = Heuristic::new(&c, targets);
        let mut search = MazeSearch::new(&rooms, &mut doors, &c, heuristic, 0, Pt::new(0.0, 0.0), 0);
        assert!(matches!(search.run(&StopToken::new(), Deadline::expired()), MazeOutcome::TimedOut));
    }

    #[test]
    fn test_stop_token_halts_search() {
        let c = control();
        let (rooms, mut doors) = two_hop_rooms_and_doors();
        let targets = vec![TargetPoint { point: Pt::new(200.0, 0.0), layer: 0 }];
        let heuristic = Heuristic::new(&c, targets);
        let mut search = MazeSearch::new(&rooms, &mut doors, &c, heuristic, 0, Pt::new(0.0, 0.0), 0);
        let stop = StopToken::new();
        stop.stop();
        assert!(matches!(search.run(&stop, Deadline::none()), MazeOutcome::Stopped));
    }
}
