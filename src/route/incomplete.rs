use std::collections::{HashMap, HashSet, VecDeque};

use crate::board::{Board, ItemId, NetId};

/// A net-local pair of items (§4.8: discovered by BFS over the
/// `physically_connected` relation, spanning not-yet-routed components of
/// the net) that still needs a trace between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncompleteConnection {
    pub net: NetId,
    pub from_item: ItemId,
    pub to_item: ItemId,
}

/// Finds the connections still missing from `net`: items on the net are
/// grouped into connected components by BFS over [`Board::physically_connected`];
/// a net with `k` components needs `k - 1` more connections. One
/// representative item per component is chosen and representatives are
/// chained pairwise, the simplest spanning strategy that guarantees every
/// component ends up reachable from every other.
pub fn find_incomplete(board: &Board, net: NetId) -> Vec<IncompleteConnection> {
    let items: Vec<ItemId> = board.items_on_net(net).map(|i| i.id()).collect();
    let mut component: HashMap<ItemId, usize> = HashMap::new();
    let mut next_component = 0usize;

    for &start in &items {
        if component.contains_key(&start) {
            continue;
        }
        component.insert(start, next_component);
        let mut queue = VecDeque::from([start]);
        while let Some(cur) = queue.pop_front() {
            let Some(cur_item) = board.item(cur) else { continue };
            for &other in &items {
                if component.contains_key(&other) {
                    continue;
                }
                let Some(other_item) = board.item(other) else { continue };
                if board.physically_connected(cur_item, other_item) {
                    component.insert(other, next_component);
                    queue.push_back(other);
                }
            }
        }
        next_component += 1;
    }

    if next_component <= 1 {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut representatives = Vec::new();
    for &item in &items {
        if seen.insert(component[&item]) {
            representatives.push(item);
        }
    }

    representatives
        .windows(2)
        .map(|w| IncompleteConnection { net, from_item: w[0], to_item: w[1] })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::item::{FixedState, Item, ItemHeader, Pin};
    use crate::board::layer::Layer;
    use crate::board::{Board, ClearanceMatrix, LayerStack};
    use crate::geom::PtI;

    fn board_with_pins(centers: &[(i64, i64)], net: NetId) -> (Board, Vec<ItemId>) {
        let layers = LayerStack::new(vec![Layer::new("F.Cu", true)]);
        let mut board = Board::new(layers, ClearanceMatrix::new(1, 1));
        let mut ids = Vec::new();
        for &(x, y) in centers {
            let pin = Item::Pin(Pin {
                header: ItemHeader::new(0, vec![net], 0, FixedState::UserFixed),
                component: "U1".into(),
                center: PtI::new(x, y),
                radius: 50,
                layer_lo: 0,
                layer_hi: 0,
            });
            ids.push(board.add_item(pin).unwrap());
        }
        (board, ids)
    }

    #[test]
    fn test_two_far_apart_pins_need_one_connection() {
        let (board, _ids) = board_with_pins(&[(0, 0), (100_000, 0)], 1);
        let missing = find_incomplete(&board, 1);
        assert_eq!(missing.len(), 1);
    }

    #[test]
    fn test_already_touching_pins_need_no_connection() {
        let (board, _ids) = board_with_pins(&[(0, 0), (50, 0)], 1);
        let missing = find_incomplete(&board, 1);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_three_separate_pins_need_two_connections() {
        let (board, _ids) = board_with_pins(&[(0, 0), (100_000, 0), (200_000, 0)], 1);
        let missing = find_incomplete(&board, 1);
        assert_eq!(missing.len(), 2);
    }
}
