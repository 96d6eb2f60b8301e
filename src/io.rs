//! External interfaces (§6): board input/output is kept behind traits so
//! the engine never depends on a specific file format. The crate ships one
//! concrete implementation, a small internal JSON document, mainly so the
//! CLI and its own tests have something to run against without depending
//! on an external DSN parser.

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::board::{Board, ClearanceMatrix, FixedState, Item, LayerStack, Net, NetClass};

/// Produces a [`Board`] from some external source. Implementors must
/// uphold the input-defect contract of §6: all referenced layer/net/class
/// indices valid, every pin `UserFixed` or `SystemFixed`, a non-degenerate
/// outline.
pub trait BoardReader {
    fn read(&self) -> Result<Board>;
}

/// Consumes a routed [`Board`]. Must preserve the ids of pre-existing items
/// and tolerate router-assigned ids on new ones; this crate's writers treat
/// the board as read-only and never renumber anything themselves.
pub trait BoardWriter {
    fn write(&self, board: &Board) -> Result<()>;
}

/// Flat snapshot of everything [`Board`] owns. Not a replacement for the
/// DSN format -- a supplement so the CLI is runnable standalone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDocument {
    pub layers: LayerStack,
    pub nets: Vec<Net>,
    pub net_classes: Vec<NetClass>,
    pub clearance: ClearanceMatrix,
    pub items: Vec<Item>,
}

impl BoardDocument {
    /// Builds a document from a live board, in on-board item order.
    pub fn from_board(board: &Board) -> Self {
        let layers = board.layers().clone();
        let nets = board.nets().cloned().collect();
        let mut items: Vec<Item> = board.items().cloned().collect();
        items.sort_by_key(Item::id);
        Self { layers, nets, net_classes: Vec::new(), clearance: board.clearance().clone(), items }
    }

    /// Validates the document against §6's input-defect contract and
    /// assembles a [`Board`]. Rejects, rather than silently repairing,
    /// anything that would leave the engine with an inconsistent model.
    pub fn into_board(self) -> Result<Board> {
        ensure!(!self.layers.is_empty(), "board must have at least one layer");

        let outline_present = self.items.iter().any(|it| matches!(it, Item::Outline(o) if o.outline.len() >= 3));
        ensure!(outline_present, "board outline missing or degenerate (fewer than 3 points)");

        for item in &self.items {
            let (lo, hi) = item.layer_span();
            if hi != crate::board::LayerId::MAX {
                ensure!(
                    (lo as usize) < self.layers.len() && (hi as usize) < self.layers.len(),
                    "item {} references a layer outside the stack",
                    item.id()
                );
            }
            for &net in item.nets() {
                ensure!(self.nets.iter().any(|n| n.id == net), "item {} references unknown net {net}", item.id());
            }
            if let Item::Pin(_) = item {
                ensure!(
                    matches!(item.header().fixed, FixedState::UserFixed | FixedState::SystemFixed),
                    "pin {} must be UserFixed or SystemFixed",
                    item.id()
                );
            }
        }
        for net in &self.nets {
            if let Some(class) = net.net_class {
                ensure!(self.net_classes.iter().any(|c| c.id == class), "net {} references unknown net-class {class}", net.id);
            }
        }

        let mut board = Board::new(self.layers, self.clearance);
        for net in self.nets {
            board.add_net(net);
        }
        for class in self.net_classes {
            board.add_net_class(class);
        }
        for item in self.items {
            let id = item.id();
            board.add_item_with_id(item, id);
        }
        Ok(board)
    }
}

/// Reads a [`BoardDocument`] from a JSON file on disk.
pub struct JsonBoardReader {
    pub path: PathBuf,
}

impl JsonBoardReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl BoardReader for JsonBoardReader {
    fn read(&self) -> Result<Board> {
        let text = fs::read_to_string(&self.path).wrap_err_with(|| format!("reading board file {}", self.path.display()))?;
        let doc: BoardDocument = serde_json::from_str(&text).wrap_err("parsing board JSON")?;
        doc.into_board().wrap_err("validating board")
    }
}

/// Writes a routed board to a JSON file.
pub struct JsonBoardWriter {
    pub path: PathBuf,
}

impl JsonBoardWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl BoardWriter for JsonBoardWriter {
    fn write(&self, board: &Board) -> Result<()> {
        let doc = BoardDocument::from_board(board);
        let text = serde_json::to_string_pretty(&doc).wrap_err("serializing board")?;
        fs::write(&self.path, text).wrap_err_with(|| format!("writing board file {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::item::{BoardOutline, ItemHeader, Pin};
    use crate::board::layer::Layer;
    use crate::geom::PtI;

    fn sample_document() -> BoardDocument {
        let layers = LayerStack::new(vec![Layer::new("F.Cu", true)]);
        let net_class = NetClass {
            id: 0,
            name: "default".into(),
            trace_half_width: vec![150],
            trace_clearance_class: 0,
            via_rule: Default::default(),
            active_layers: vec![true],
            shove_fix: false,
            pull_tight: false,
            length_min: None,
            length_max: None,
        };
        let net = Net { id: 1, name: "N1".into(), net_class: Some(0), contains_conductive_plane: false };
        let outline = Item::Outline(BoardOutline {
            header: ItemHeader::new(0, vec![], 0, FixedState::SystemFixed),
            outline: vec![PtI::new(0, 0), PtI::new(100_000, 0), PtI::new(100_000, 100_000), PtI::new(0, 100_000)],
        });
        let pin = Item::Pin(Pin {
            header: ItemHeader::new(1, vec![1], 0, FixedState::UserFixed),
            component: "U1".into(),
            center: PtI::new(10_000, 10_000),
            radius: 500,
            layer_lo: 0,
            layer_hi: 0,
        });
        BoardDocument { layers, nets: vec![net], net_classes: vec![net_class], clearance: ClearanceMatrix::new(1, 1), items: vec![outline, pin] }
    }

    #[test]
    fn test_round_trip_through_json() {
        let doc = sample_document();
        let text = serde_json::to_string(&doc).unwrap();
        let board = JsonBoardReaderFromStr(&text).read().unwrap();
        assert_eq!(board.items().count(), 2);
        assert_eq!(board.layers().len(), 1);
    }

    #[test]
    fn test_rejects_missing_outline() {
        let mut doc = sample_document();
        doc.items.retain(|it| !matches!(it, Item::Outline(_)));
        assert!(doc.into_board().is_err());
    }

    #[test]
    fn test_rejects_unfixed_pin() {
        let mut doc = sample_document();
        if let Some(Item::Pin(p)) = doc.items.iter_mut().find(|it| matches!(it, Item::Pin(_))) {
            p.header.fixed = FixedState::NotFixed;
        }
        assert!(doc.into_board().is_err());
    }

    #[test]
    fn test_rejects_item_on_unknown_net() {
        let mut doc = sample_document();
        if let Some(Item::Pin(p)) = doc.items.iter_mut().find(|it| matches!(it, Item::Pin(_))) {
            p.header.nets = vec![99];
        }
        assert!(doc.into_board().is_err());
    }

    /// Test-only helper: parses JSON from a string instead of a file, so
    /// the round-trip test doesn't need a temp file.
    struct JsonBoardReaderFromStr<'a>(&'a str);
    impl BoardReader for JsonBoardReaderFromStr<'_> {
        fn read(&self) -> Result<Board> {
            let doc: BoardDocument = serde_json::from_str(self.0)?;
            doc.into_board()
        }
    }
}
