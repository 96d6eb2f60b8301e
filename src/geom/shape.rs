use crate::geom::line::Line;
use crate::geom::point::Pt;
use crate::geom::rect::IntBox;
use crate::geom::{is_left_of, PtI};

const EPS: f64 = 1e-9;

/// A convex tile: the shape kind used throughout room decomposition. Doors
/// and expansion room shapes are all convex tiles of dimension 0 (point), 1
/// (segment) or 2 (polygon, stored counter-clockwise).
#[derive(Debug, Clone, PartialEq)]
pub enum ConvexTile {
    Empty,
    Point(Pt),
    Segment(Pt, Pt),
    /// Counter-clockwise, convex, non-degenerate (area > 0).
    Polygon(Vec<Pt>),
}

impl ConvexTile {
    pub fn rect(lo: Pt, hi: Pt) -> Self {
        if hi.x <= lo.x || hi.y <= lo.y {
            return ConvexTile::Empty;
        }
        ConvexTile::Polygon(vec![
            Pt::new(lo.x, lo.y),
            Pt::new(hi.x, lo.y),
            Pt::new(hi.x, hi.y),
            Pt::new(lo.x, hi.y),
        ])
    }

    pub fn polygon(mut pts: Vec<Pt>) -> Self {
        if pts.len() < 3 {
            return match pts.len() {
                0 => ConvexTile::Empty,
                1 => ConvexTile::Point(pts[0]),
                _ => ConvexTile::Segment(pts[0], pts[1]),
            };
        }
        if !is_ccw(&pts) {
            pts.reverse();
        }
        ConvexTile::Polygon(pts)
    }

    pub fn dimension(&self) -> i32 {
        match self {
            ConvexTile::Empty => -1,
            ConvexTile::Point(_) => 0,
            ConvexTile::Segment(..) => 1,
            ConvexTile::Polygon(_) => 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ConvexTile::Empty)
    }

    fn vertices(&self) -> Vec<Pt> {
        match self {
            ConvexTile::Empty => vec![],
            ConvexTile::Point(p) => vec![*p],
            ConvexTile::Segment(a, b) => vec![*a, *b],
            ConvexTile::Polygon(pts) => pts.clone(),
        }
    }

    pub fn bounding_box(&self) -> IntBox {
        let pts = self.vertices();
        if pts.is_empty() {
            return IntBox::empty();
        }
        let lo = PtI::new(
            pts.iter().map(|p| p.x.floor() as i64).min().unwrap(),
            pts.iter().map(|p| p.y.floor() as i64).min().unwrap(),
        );
        let hi = PtI::new(
            pts.iter().map(|p| p.x.ceil() as i64).max().unwrap(),
            pts.iter().map(|p| p.y.ceil() as i64).max().unwrap(),
        );
        IntBox::new(lo, hi)
    }

    pub fn contains(&self, p: Pt) -> bool {
        match self {
            ConvexTile::Empty => false,
            ConvexTile::Point(q) => (p - *q).mag2() < EPS,
            ConvexTile::Segment(a, b) => point_on_segment(p, *a, *b),
            ConvexTile::Polygon(pts) => {
                pts.iter().enumerate().all(|(i, &a)| {
                    let b = pts[(i + 1) % pts.len()];
                    Line::through(a, b).side_of(p) >= -EPS
                })
            }
        }
    }

    /// The maximum signed distance from any point of `self` to the left of
    /// `line`: positive if any part of the shape is left of the line.
    pub fn distance_to_left_of(&self, line: &Line) -> f64 {
        self.vertices()
            .iter()
            .map(|&p| line.side_of(p))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// True if `line` strictly separates the shape: some point is strictly
    /// left and some point is strictly right.
    pub fn intersects_interior(&self, line: &Line) -> bool {
        let sides: Vec<f64> = self.vertices().iter().map(|&p| line.side_of(p)).collect();
        sides.iter().any(|&s| s > EPS) && sides.iter().any(|&s| s < -EPS)
    }

    /// Clips to the half-plane left of `line` (inclusive).
    pub fn intersect_with_half_plane(&self, line: &Line) -> ConvexTile {
        match self {
            ConvexTile::Empty => ConvexTile::Empty,
            ConvexTile::Point(p) => {
                if line.side_of(*p) >= -EPS { self.clone() } else { ConvexTile::Empty }
            }
            ConvexTile::Segment(a, b) => clip_segment(*a, *b, line),
            ConvexTile::Polygon(pts) => clip_polygon(pts, line),
        }
    }

    pub fn intersection(&self, other: &ConvexTile) -> ConvexTile {
        match other {
            ConvexTile::Empty => ConvexTile::Empty,
            ConvexTile::Point(p) => {
                if self.contains(*p) { ConvexTile::Point(*p) } else { ConvexTile::Empty }
            }
            ConvexTile::Segment(a, b) => {
                // Clip the segment by self's border half-planes (or, if self
                // isn't a polygon, fall back to the symmetric case).
                match self {
                    ConvexTile::Polygon(pts) => {
                        let mut cur = ConvexTile::Segment(*a, *b);
                        for i in 0..pts.len() {
                            if cur.is_empty() {
                                break;
                            }
                            let line = border_line_of(pts, i);
                            cur = cur.intersect_with_half_plane(&line);
                        }
                        cur
                    }
                    _ => other.intersection(self),
                }
            }
            ConvexTile::Polygon(opts) => {
                let mut cur = self.clone();
                for i in 0..opts.len() {
                    if cur.is_empty() {
                        break;
                    }
                    let line = border_line_of(opts, i);
                    cur = cur.intersect_with_half_plane(&line);
                }
                cur
            }
        }
    }

    pub fn border_line_count(&self) -> usize {
        match self {
            ConvexTile::Empty | ConvexTile::Point(_) => 0,
            ConvexTile::Segment(..) => 1,
            ConvexTile::Polygon(pts) => pts.len(),
        }
    }

    /// Border edge `i`, counter-clockwise: the shape's interior lies to the
    /// left of the returned line.
    pub fn border_line(&self, i: usize) -> Line {
        match self {
            ConvexTile::Segment(a, b) => Line::through(*a, *b),
            ConvexTile::Polygon(pts) => border_line_of(pts, i),
            _ => panic!("shape has no border lines"),
        }
    }

    /// Indices of `self`'s border edges that coincide (overlap with nonzero
    /// length, collinear) with some edge of `other`. `None` if the shapes
    /// only overlap in 2-D, or don't touch at all.
    pub fn touching_sides(&self, other: &ConvexTile) -> Option<Vec<usize>> {
        if self.intersection(other).dimension() == 2 {
            return None;
        }
        let mut touching = Vec::new();
        for i in 0..self.border_line_count() {
            let (sa, sb) = self.edge_points(i);
            for j in 0..other.border_line_count() {
                let (oa, ob) = other.edge_points(j);
                if segments_overlap_collinear(sa, sb, oa, ob) {
                    touching.push(i);
                    break;
                }
            }
        }
        if touching.is_empty() { None } else { Some(touching) }
    }

    fn edge_points(&self, i: usize) -> (Pt, Pt) {
        match self {
            ConvexTile::Segment(a, b) => (*a, *b),
            ConvexTile::Polygon(pts) => (pts[i], pts[(i + 1) % pts.len()]),
            _ => panic!("shape has no edges"),
        }
    }
}

fn border_line_of(pts: &[Pt], i: usize) -> Line {
    let a = pts[i];
    let b = pts[(i + 1) % pts.len()];
    Line::through(a, b)
}

fn is_ccw(pts: &[Pt]) -> bool {
    let area: f64 = (0..pts.len())
        .map(|i| {
            let a = pts[i];
            let b = pts[(i + 1) % pts.len()];
            a.cross(b)
        })
        .sum();
    area > 0.0
}

fn point_on_segment(p: Pt, a: Pt, b: Pt) -> bool {
    let d = b - a;
    if d.mag2() < EPS {
        return (p - a).mag2() < EPS;
    }
    let t = (p - a).dot(d) / d.mag2();
    if !(-EPS..=1.0 + EPS).contains(&t) {
        return false;
    }
    let proj = a + d * t;
    (p - proj).mag2() < EPS
}

fn clip_segment(a: Pt, b: Pt, line: &Line) -> ConvexTile {
    let sa = line.side_of(a);
    let sb = line.side_of(b);
    match (sa >= -EPS, sb >= -EPS) {
        (true, true) => ConvexTile::Segment(a, b),
        (false, false) => ConvexTile::Empty,
        _ => {
            let t = sa / (sa - sb);
            let mid = a.lerp(b, t);
            if sa >= -EPS { ConvexTile::Segment(a, mid) } else { ConvexTile::Segment(mid, b) }
        }
    }
}

fn clip_polygon(pts: &[Pt], line: &Line) -> ConvexTile {
    let n = pts.len();
    let mut out = Vec::with_capacity(n + 1);
    for i in 0..n {
        let cur = pts[i];
        let next = pts[(i + 1) % n];
        let cur_in = line.side_of(cur) >= -EPS;
        let next_in = line.side_of(next) >= -EPS;
        if cur_in {
            out.push(cur);
        }
        if cur_in != next_in {
            if let Some(ix) = line.intersect(&Line::through(cur, next)) {
                out.push(ix);
            }
        }
    }
    ConvexTile::polygon(dedup_close(out))
}

fn dedup_close(pts: Vec<Pt>) -> Vec<Pt> {
    let mut out: Vec<Pt> = Vec::with_capacity(pts.len());
    for p in pts {
        let keep = match out.last() {
            Some(&l) => (l - p).mag2() > EPS * EPS,
            None => true,
        };
        if keep {
            out.push(p);
        }
    }
    if out.len() > 1 && (out[0] - out[out.len() - 1]).mag2() <= EPS * EPS {
        out.pop();
    }
    out
}

fn segments_overlap_collinear(a1: Pt, a2: Pt, b1: Pt, b2: Pt) -> bool {
    let line_a = Line::through(a1, a2);
    if line_a.side_of(b1).abs() > 1e-6 || line_a.side_of(b2).abs() > 1e-6 {
        return false;
    }
    // Project onto the a1->a2 direction and check for 1-D interval overlap.
    let d = a2 - a1;
    let len2 = d.mag2();
    if len2 < EPS {
        return false;
    }
    let ta1 = 0.0;
    let ta2 = 1.0;
    let tb1 = (b1 - a1).dot(d) / len2;
    let tb2 = (b2 - a1).dot(d) / len2;
    let (tb_lo, tb_hi) = (tb1.min(tb2), tb1.max(tb2));
    let lo = ta1.max(tb_lo);
    let hi = ta2.min(tb_hi);
    hi - lo > 1e-6
}

pub fn relative_gt(a: f64, b: f64) -> bool {
    a > b + EPS
}

pub fn ensure_ccw_check(pts: &[Pt]) -> bool {
    pts.len() < 3 || is_left_of(pts[2], pts[0], pts[1])
}
