use std::collections::HashMap;

use crate::board::LayerId;
use crate::geom::{ConvexTile, Pt, PtI};
use crate::route::room::RoomId;

/// A single candidate via placement inside a room's restrained shape,
/// spanning `[layer_lo, layer_hi]`.
#[derive(Debug, Clone, Copy)]
pub struct DrillSite {
    pub point: PtI,
    pub layer_lo: LayerId,
    pub layer_hi: LayerId,
}

/// Lazily enumerated, per-room set of drill sites for one via span. Sites
/// are generated once (on first access) and reused by later connections
/// through the same room until a board mutation invalidates the page.
///
/// Per §9's Open Questions resolution: `reset` clears only the
/// per-connection `visited` bits (so occupied-this-search bookkeeping
/// starts fresh), while `invalidate` drops the generated geometry outright
/// and forces regeneration next access, because the underlying room shape
/// may have changed.
#[derive(Debug, Clone)]
pub struct DrillPage {
    room: RoomId,
    layer_lo: LayerId,
    layer_hi: LayerId,
    sites: Vec<DrillSite>,
    visited: Vec<bool>,
    generated: bool,
}

impl DrillPage {
    fn empty(room: RoomId, layer_lo: LayerId, layer_hi: LayerId) -> Self {
        Self { room, layer_lo, layer_hi, sites: Vec::new(), visited: Vec::new(), generated: false }
    }

    /// Ensures sites are generated against `shape`, then returns them.
    pub fn sites(&mut self, shape: &ConvexTile) -> &[DrillSite] {
        if !self.generated {
            self.sites = generate_sites(shape, self.layer_lo, self.layer_hi);
            self.visited = vec![false; self.sites.len()];
            self.generated = true;
        }
        &self.sites
    }

    pub fn mark_visited(&mut self, idx: usize) {
        self.visited[idx] = true;
    }

    pub fn is_visited(&self, idx: usize) -> bool {
        self.visited[idx]
    }

    pub fn reset(&mut self) {
        self.visited.iter_mut().for_each(|v| *v = false);
    }

    pub fn invalidate(&mut self) {
        self.generated = false;
        self.sites.clear();
        self.visited.clear();
    }
}

/// One candidate site per vertex plus the centroid, matching the coarse
/// convex-tile obstacle model used elsewhere: cheap to compute, adequate for
/// picking a drill point that the restraining algorithm has already pushed
/// clear of obstacles.
fn generate_sites(shape: &ConvexTile, layer_lo: LayerId, layer_hi: LayerId) -> Vec<DrillSite> {
    let candidates: Vec<Pt> = match shape {
        ConvexTile::Empty => Vec::new(),
        ConvexTile::Point(p) => vec![*p],
        ConvexTile::Segment(a, b) => vec![*a, *b, a.lerp(*b, 0.5)],
        ConvexTile::Polygon(pts) => {
            let mut v = pts.clone();
            let n = pts.len() as f64;
            let centroid = pts.iter().fold(Pt::zero(), |acc, p| acc + *p) * (1.0 / n);
            v.push(centroid);
            v
        }
    };
    candidates
        .into_iter()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .map(|p| DrillSite { point: PtI::new(p.x.round() as i64, p.y.round() as i64), layer_lo, layer_hi })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PageKey {
    room: RoomId,
    layer_lo: LayerId,
    layer_hi: LayerId,
}

/// Owns every [`DrillPage`] generated so far, keyed by room and via span.
#[derive(Debug, Clone, Default)]
pub struct DrillPageCache {
    pages: HashMap<PageKey, DrillPage>,
}

impl DrillPageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&mut self, room: RoomId, layer_lo: LayerId, layer_hi: LayerId) -> &mut DrillPage {
        self.pages.entry(PageKey { room, layer_lo, layer_hi }).or_insert_with(|| DrillPage::empty(room, layer_lo, layer_hi))
    }

    /// Per-connection: clear visited bits on every cached page, keep the
    /// generated geometry.
    pub fn reset_all(&mut self) {
        for page in self.pages.values_mut() {
            page.reset();
        }
    }

    /// Per-board-mutation: drop all generated geometry so the next access
    /// regenerates against the current obstacle layout.
    pub fn invalidate_all(&mut self) {
        for page in self.pages.values_mut() {
            page.invalidate();
        }
    }

    pub fn invalidate_room(&mut self, room: RoomId) {
        for (key, page) in self.pages.iter_mut() {
            if key.room == room {
                page.invalidate();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_sites_polygon_includes_centroid() {
        let shape = ConvexTile::rect(Pt::new(0.0, 0.0), Pt::new(100.0, 100.0));
        let sites = generate_sites(&shape, 0, 1);
        assert!(sites.iter().any(|s| s.point == PtI::new(50, 50)));
    }

    #[test]
    fn test_page_lazy_generation_and_reset() {
        let mut page = DrillPage::empty(1, 0, 1);
        let shape = ConvexTile::rect(Pt::new(0.0, 0.0), Pt::new(100.0, 100.0));
        assert!(!page.generated);
        let n = page.sites(&shape).len();
        assert!(page.generated);
        assert!(n > 0);
        page.mark_visited(0);
        assert!(page.is_visited(0));
        page.reset();
        assert!(!page.is_visited(0));
        page.invalidate();
        assert!(!page.generated);
    }

    #[test]
    fn test_cache_invalidate_room_only_affects_that_room() {
        let mut cache = DrillPageCache::new();
        let shape = ConvexTile::rect(Pt::new(0.0, 0.0), Pt::new(10.0, 10.0));
        cache.page(1, 0, 1).sites(&shape);
        cache.page(2, 0, 1).sites(&shape);
        cache.invalidate_room(1);
        assert!(!cache.page(1, 0, 1).generated);
        assert!(cache.page(2, 0, 1).generated);
    }
}
