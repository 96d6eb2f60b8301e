use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::board::pcb::CONNECTION_TOLERANCE;
use crate::board::{Board, Item, ItemId, LayerId, NetId};
use crate::geom::ConvexTile;
use crate::geom::IntBox;
use crate::route::connection::path_length;
use crate::route::cost::Control;
use crate::route::heuristic::{Heuristic, TargetPoint};
use crate::route::incomplete::{find_incomplete, IncompleteConnection};
use crate::route::maze::{MazeOutcome, MazeSearch};
use crate::route::mutation::{ripup, rollback, synthesize_path};
use crate::route::room::{build_connection_graph, BoardObstacles};
use crate::route::stop::{Deadline, StopToken};

/// Per-run knobs for the batch pass controller (§4.9). Deliberately
/// independent of [`Control`], which is rebuilt fresh per connection from
/// the net's class: this is board-wide policy, not per-net cost tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Upper bound on rip-up/retry passes before giving up on the
    /// remaining unrouted connections.
    pub max_passes: u32,
    /// Rip-up cost ceiling handed to [`Control::from_net_class`] on the
    /// first pass; escalated internally per pass via [`Control::ripup_cost`].
    pub ripup_cost_limit: f64,
    /// Margin added around the board's own geometry when no explicit
    /// outline item is present, to seed the free-space universe shape.
    pub universe_margin: i64,
    /// Wall-clock budget for the whole batch; `None` means no deadline.
    /// Applies across every connection/pass, not per-connection (§5).
    #[serde(with = "duration_secs_opt")]
    pub time_limit: Option<Duration>,
    /// At the end of the batch, delete `NotFixed` vias left with no trace
    /// on one of their two layers (§11 supplemented feature).
    pub remove_unconnected_vias: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { max_passes: 10, ripup_cost_limit: 2000.0, universe_margin: 500_000, time_limit: None, remove_unconnected_vias: true }
    }
}

mod duration_secs_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        value.map(|d| d.as_secs_f64()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.map(Duration::from_secs_f64))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Routed,
    /// Search completed without reaching a target door (queue exhausted,
    /// or the iteration cap was hit -- §7's resource-exhaustion downgrade).
    NotRouted,
    /// A path was found but synthesis failed (e.g. no via fits the
    /// required layer span); rolled back, board left unchanged.
    Failed,
    Stopped,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct ConnectionResult {
    pub net: NetId,
    pub from_item: ItemId,
    pub to_item: ItemId,
    pub status: ConnectionStatus,
    pub detour_ratio: Option<f64>,
    pub path_length: Option<f64>,
    pub pass: u32,
}

/// Summary of a full `route_connection`/`batch_route` run (§6 control
/// surface). `air_wires` lists every connection still unrouted after the
/// final pass, i.e. what a GUI would draw as a straight dashed line.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub passes_run: u32,
    pub results: Vec<ConnectionResult>,
    pub air_wires: Vec<(ItemId, ItemId)>,
}

impl BatchReport {
    pub fn routed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status == ConnectionStatus::Routed).count()
    }
}

fn cancelled_result(conn: &IncompleteConnection, pass: u32, timed_out: bool) -> ConnectionResult {
    ConnectionResult {
        net: conn.net,
        from_item: conn.from_item,
        to_item: conn.to_item,
        status: if timed_out { ConnectionStatus::TimedOut } else { ConnectionStatus::Stopped },
        detour_ratio: None,
        path_length: None,
        pass,
    }
}

/// Attempts one connection on one pass: builds the room/door graph for the
/// net's free space, runs the maze search, and on success rips up whatever
/// the winning path crossed and synthesizes the new trace/via chain. On
/// search failure or on synthesis failure (rolled back automatically) the
/// board is left untouched and the connection is reported failed.
pub fn route_connection(
    board: &mut Board,
    conn: &IncompleteConnection,
    ripup_cost_limit: f64,
    ripup_pass_no: u32,
    universe_margin: i64,
    stop: &StopToken,
    deadline: Deadline,
) -> ConnectionResult {
    let fallback = ConnectionResult {
        net: conn.net,
        from_item: conn.from_item,
        to_item: conn.to_item,
        status: ConnectionStatus::NotRouted,
        detour_ratio: None,
        path_length: None,
        pass: ripup_pass_no,
    };

    let Some(net_class) = board.net_class_for(conn.net).cloned() else { return fallback };
    let (Some(from), Some(to)) = (board.item(conn.from_item), board.item(conn.to_item)) else { return fallback };

    let n_layer = board.layers().len();
    let active_layers: Vec<LayerId> = (0..n_layer as LayerId).filter(|&l| net_class.is_layer_active(l)).collect();
    let from_span = from.layer_span();
    let to_span = to.layer_span();
    let Some(start_layer) = active_layers.iter().copied().find(|&l| l >= from_span.0 && l <= from_span.1) else { return fallback };
    if !active_layers.iter().any(|&l| l >= to_span.0 && l <= to_span.1) {
        return fallback;
    }
    let start = from.bbox().center().to_pt();
    let dest = to.bbox().center().to_pt();

    let control = Control::from_net_class(conn.net, &net_class, n_layer, ripup_cost_limit, ripup_pass_no);
    let universe = board_universe(board, universe_margin);

    let outcome = {
        let our_class = net_class.trace_clearance_class;
        let half_widths = control.trace_half_width.clone();
        let clearance = board.clearance().clone();
        let obstacles = BoardObstacles {
            board: &*board,
            exempt_nets: &[conn.net],
            compensation: Box::new(move |item, layer: LayerId| {
                let half_width = half_widths.get(layer as usize).copied().unwrap_or(0);
                clearance.get_value(our_class, item.header().clearance_class, layer) + half_width
            }),
        };
        let graph =
            build_connection_graph(universe, &active_layers, &net_class.via_rule, start, start_layer, dest, to_span, conn.to_item, &obstacles);
        let targets: Vec<TargetPoint> =
            active_layers.iter().copied().filter(|&l| l >= to_span.0 && l <= to_span.1).map(|l| TargetPoint { point: dest, layer: l }).collect();
        let heuristic = Heuristic::new(&control, targets);
        let rooms = graph.rooms;
        let mut doors = graph.doors;
        let mut search = MazeSearch::new(&rooms, &mut doors, &control, heuristic, graph.start_room, start, start_layer);
        search.run(stop, deadline)
    };

    let result = match outcome {
        MazeOutcome::NotFound => return fallback,
        MazeOutcome::Stopped => return cancelled_result(conn, ripup_pass_no, false),
        MazeOutcome::TimedOut => return cancelled_result(conn, ripup_pass_no, true),
        MazeOutcome::Found(result) => result,
    };

    let straight = start.dist(dest);
    let length = path_length(&result.path);
    let detour_ratio = if straight < 1e-9 { 1.0 } else { length / straight };

    let removed = ripup(board, &result.ripup_items);
    match synthesize_path(board, conn.net, &control, &result) {
        Ok(_ids) => ConnectionResult {
            net: conn.net,
            from_item: conn.from_item,
            to_item: conn.to_item,
            status: ConnectionStatus::Routed,
            detour_ratio: Some(detour_ratio),
            path_length: Some(length),
            pass: ripup_pass_no,
        },
        Err(_) => {
            rollback(board, removed);
            ConnectionResult { status: ConnectionStatus::Failed, ..fallback }
        }
    }
}

/// Runs up to `config.max_passes` rip-up/retry passes over every net's
/// incomplete connections (§4.9): each pass re-discovers what's still
/// missing (a previous pass's rip-ups can re-open connections that looked
/// complete), and routes with an escalated rip-up cost ceiling. A pass
/// that routes nothing makes no progress by either of §4.9's criteria
/// (incomplete count and aggregate routed length both depend on at least
/// one successful route this pass) and ends the batch early.
pub fn batch_route(board: &mut Board, config: &Config, stop: &StopToken) -> BatchReport {
    let mut report = BatchReport::default();
    let deadline = config.time_limit.map(Deadline::after).unwrap_or_else(Deadline::none);

    'passes: for pass in 0..config.max_passes {
        report.passes_run = pass + 1;
        let nets: Vec<NetId> = board.nets().map(|n| n.id).collect();
        let mut pending: Vec<IncompleteConnection> = Vec::new();
        for net in nets {
            pending.extend(find_incomplete(board, net));
        }
        if pending.is_empty() {
            break;
        }

        let mut routed_this_pass = 0usize;
        for conn in &pending {
            if stop.is_stopped() || deadline.elapsed() {
                report.results.push(cancelled_result(conn, pass, deadline.elapsed()));
                break 'passes;
            }
            let result = route_connection(board, conn, config.ripup_cost_limit, pass, config.universe_margin, stop, deadline);
            if result.status == ConnectionStatus::Routed {
                routed_this_pass += 1;
            }
            let cancelled = matches!(result.status, ConnectionStatus::Stopped | ConnectionStatus::TimedOut);
            report.results.push(result);
            if cancelled {
                break 'passes;
            }
        }
        if routed_this_pass == 0 {
            break;
        }
    }

    if config.remove_unconnected_vias {
        remove_unconnected_vias(board);
    }

    report.air_wires = report
        .results
        .iter()
        .filter(|r| matches!(r.status, ConnectionStatus::Failed | ConnectionStatus::NotRouted))
        .map(|r| (r.from_item, r.to_item))
        .collect();
    report
}

/// Deletes `NotFixed` vias that have no trace attached on at least one of
/// their two layers -- the remnant of a rip-up that removed the trace on
/// one side but left the via itself (§11).
fn remove_unconnected_vias(board: &mut Board) {
    let traces: Vec<&Item> = board.items().filter(|it| matches!(it, Item::Trace(_))).collect();
    let has_trace_on_side = |via: &crate::board::item::Via, layer: LayerId, net: NetId| {
        traces.iter().any(|it| {
            let Item::Trace(t) = it else { return false };
            t.layer == layer && t.header.nets.contains(&net) && (t.p0.dist2(via.center) <= CONNECTION_TOLERANCE * CONNECTION_TOLERANCE || t.p1.dist2(via.center) <= CONNECTION_TOLERANCE * CONNECTION_TOLERANCE)
        })
    };
    let stale: Vec<ItemId> = board
        .items()
        .filter_map(|it| {
            let Item::Via(v) = it else { return None };
            if !v.header.fixed.is_ripup_eligible() {
                return None;
            }
            let net = *v.header.nets.first()?;
            let connected_lo = has_trace_on_side(v, v.layer_lo, net);
            let connected_hi = has_trace_on_side(v, v.layer_hi, net);
            (!connected_lo || !connected_hi).then_some(v.header.id)
        })
        .collect();
    for id in stale {
        board.remove_item(id);
    }
}

fn board_universe(board: &Board, margin: i64) -> ConvexTile {
    let outline = board
        .items()
        .find_map(|it| match it {
            crate::board::Item::Outline(o) => Some(IntBox::from_points(o.outline.iter().copied())),
            _ => None,
        })
        .unwrap_or_else(|| board.items().fold(IntBox::empty(), |acc, it| acc.union_with(&it.bbox())))
        .expand(margin);
    ConvexTile::rect(outline.lo.to_pt(), outline.hi.to_pt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::item::{FixedState, Item, ItemHeader, Pin};
    use crate::board::layer::Layer;
    use crate::board::{ClearanceMatrix, LayerStack, Net, NetClass, ViaDef, ViaRule};
    use crate::geom::PtI;

    fn board_with_two_pins(net: NetId) -> Board {
        let layers = LayerStack::new(vec![Layer::new("F.Cu", true)]);
        let mut board = Board::new(layers, ClearanceMatrix::new(1, 1));
        board.add_net(Net { id: net, name: "NET1".into(), net_class: Some(0), contains_conductive_plane: false });
        board.add_net_class(NetClass {
            id: 0,
            name: "default".into(),
            trace_half_width: vec![100],
            trace_clearance_class: 0,
            via_rule: ViaRule { vias: vec![ViaDef { radius: 100.0, layer_lo: 0, layer_hi: 0, cost: 50.0, cheap: false }] },
            active_layers: vec![true],
            shove_fix: false,
            pull_tight: false,
            length_min: None,
            length_max: None,
        });
        let pin_a = Item::Pin(Pin {
            header: ItemHeader::new(0, vec![net], 0, FixedState::UserFixed),
            component: "U1".into(),
            center: PtI::new(0, 0),
            radius: 50,
            layer_lo: 0,
            layer_hi: 0,
        });
        let pin_b = Item::Pin(Pin {
            header: ItemHeader::new(0, vec![net], 0, FixedState::UserFixed),
            component: "U2".into(),
            center: PtI::new(500_000, 0),
            radius: 50,
            layer_lo: 0,
            layer_hi: 0,
        });
        board.add_item(pin_a).unwrap();
        board.add_item(pin_b).unwrap();
        board
    }

    #[test]
    fn test_batch_route_connects_two_pins_in_open_space() {
        let mut board = board_with_two_pins(1);
        let report = batch_route(&mut board, &Config::default(), &StopToken::new());
        assert_eq!(report.routed_count(), 1);
        assert!(report.air_wires.is_empty());
        assert!(board.items().any(|it| matches!(it, Item::Trace(_))));
    }

    #[test]
    fn test_batch_route_on_fully_connected_net_is_a_no_op() {
        let layers = LayerStack::new(vec![Layer::new("F.Cu", true)]);
        let mut board = Board::new(layers, ClearanceMatrix::new(1, 1));
        board.add_net(Net { id: 1, name: "NET1".into(), net_class: Some(0), contains_conductive_plane: false });
        board.add_net_class(NetClass {
            id: 0,
            name: "default".into(),
            trace_half_width: vec![100],
            trace_clearance_class: 0,
            via_rule: ViaRule::default(),
            active_layers: vec![true],
            shove_fix: false,
            pull_tight: false,
            length_min: None,
            length_max: None,
        });
        let report = batch_route(&mut board, &Config::default(), &StopToken::new());
        assert_eq!(report.passes_run, 1);
        assert!(report.results.is_empty());
    }

    #[test]
    fn test_batch_route_respects_already_stopped_token() {
        let mut board = board_with_two_pins(1);
        let stop = StopToken::new();
        stop.stop();
        let report = batch_route(&mut board, &Config::default(), &stop);
        assert!(report.results.iter().any(|r| r.status == ConnectionStatus::Stopped));
        assert!(board.items().all(|it| !matches!(it, Item::Trace(_))));
    }

    #[test]
    fn test_batch_route_respects_expired_deadline() {
        let mut board = board_with_two_pins(1);
        let config = Config { time_limit: Some(Duration::ZERO), ..Config::default() };
        let report = batch_route(&mut board, &config, &StopToken::new());
        assert!(report.results.iter().any(|r| r.status == ConnectionStatus::TimedOut));
    }

    #[test]
    fn test_remove_unconnected_vias_deletes_dangling_via() {
        let layers = LayerStack::new(vec![Layer::new("F.Cu", true), Layer::new("B.Cu", true)]);
        let mut board = Board::new(layers, ClearanceMatrix::new(1, 2));
        let via = Item::Via(crate::board::item::Via {
            header: ItemHeader::new(0, vec![1], 0, FixedState::NotFixed),
            center: PtI::new(0, 0),
            radius: 100,
            layer_lo: 0,
            layer_hi: 1,
        });
        let id = board.add_item(via).unwrap();
        remove_unconnected_vias(&mut board);
        assert!(board.item(id).is_none());
    }
}
