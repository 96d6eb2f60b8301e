use eyre::{eyre, Result};

use crate::board::item::{FixedState, Item, ItemHeader, Trace, Via};
use crate::board::{Board, ItemId, NetId};
use crate::geom::PtI;
use crate::route::cost::Control;
use crate::route::maze::MazeSearchResult;

/// Deletes `items` from `board`, returning them (with their original ids)
/// so a failed insertion can be rolled back via [`rollback`] (§4.10).
pub fn ripup(board: &mut Board, items: &[ItemId]) -> Vec<(ItemId, Item)> {
    items.iter().filter_map(|&id| board.remove_item(id).map(|it| (id, it))).collect()
}

/// Re-inserts previously rip-up'd items at their original ids, undoing
/// [`ripup`].
pub fn rollback(board: &mut Board, removed: Vec<(ItemId, Item)>) {
    for (id, item) in removed {
        board.add_item_with_id(item, id);
    }
}

/// Turns a winning [`MazeSearchResult`] into board items: one trace per
/// same-layer path segment, one via at each layer change. On failure
/// (typically: no via fits the required layer span) every item already
/// inserted for this path is removed before returning the error, per
/// §4.10's insert-or-rollback contract.
pub fn synthesize_path(board: &mut Board, net: NetId, control: &Control, result: &MazeSearchResult) -> Result<Vec<ItemId>> {
    let mut new_ids = Vec::new();
    for w in result.path.windows(2) {
        let (a, b) = (w[0], w[1]);
        let outcome = if a.layer == b.layer {
            insert_trace(board, net, control, a.layer, a.point, b.point)
        } else {
            insert_via(board, net, control, a.layer, b.layer, a.point)
        };
        match outcome {
            Ok(id) => new_ids.push(id),
            Err(e) => {
                for id in new_ids {
                    board.remove_item(id);
                }
                return Err(e);
            }
        }
    }
    Ok(new_ids)
}

fn insert_trace(
    board: &mut Board,
    net: NetId,
    control: &Control,
    layer: crate::board::LayerId,
    from: crate::geom::Pt,
    to: crate::geom::Pt,
) -> Result<ItemId> {
    let full_width = *control
        .compensated_half_width
        .get(layer as usize)
        .ok_or_else(|| eyre!("no half-width configured for layer {layer}"))?;
    // Neckdown (§11): when enabled, synthesize at a reduced half-width
    // rather than the net class's full compensated width. The maze search
    // already restrained rooms against the full width, so this only
    // narrows the as-built trace -- a conservative simplification, never a
    // connectivity aid.
    let half_width = if control.with_neckdown { (full_width / 2).max(1) } else { full_width };
    let trace = Item::Trace(Trace {
        header: ItemHeader::new(0, vec![net], 0, FixedState::NotFixed),
        p0: to_pti(from),
        p1: to_pti(to),
        layer,
        half_width,
    });
    board.add_item(trace)
}

fn insert_via(
    board: &mut Board,
    net: NetId,
    control: &Control,
    layer_a: crate::board::LayerId,
    layer_b: crate::board::LayerId,
    at: crate::geom::Pt,
) -> Result<ItemId> {
    let (lo, hi) = if layer_a < layer_b { (layer_a, layer_b) } else { (layer_b, layer_a) };
    let via_def = control.via_rule.preferred_for_span(lo, hi).ok_or_else(|| eyre!("no via fits layer span {lo}..={hi}"))?;
    let via = Item::Via(Via {
        header: ItemHeader::new(0, vec![net], 0, FixedState::NotFixed),
        center: to_pti(at),
        radius: via_def.radius.round() as i64,
        layer_lo: lo,
        layer_hi: hi,
    });
    board.add_item(via)
}

fn to_pti(p: crate::geom::Pt) -> PtI {
    PtI::new(p.x.round() as i64, p.y.round() as i64)
}
