//! Geometry substrate: points, rectangles, directed lines and convex-tile
//! shapes. Board-level coordinates are integers (see [`PtI`]); the clipping
//! operations needed by room restraining produce arbitrary real-valued
//! intersection points, so shapes are carried in floating point (see [`Pt`]).

pub mod line;
pub mod point;
pub mod rect;
pub mod shape;

pub use line::Line;
pub use point::{Pt, PtI, COORD_BOUND};
pub use rect::IntBox;
pub use shape::ConvexTile;

/// Cross product of vectors `o->a` and `o->b`.
pub fn cross_at(o: Pt, a: Pt, b: Pt) -> f64 {
    (a - o).cross(b - o)
}

/// True if `p` is strictly left of the directed line `st -> en`.
pub fn is_strictly_left_of(p: Pt, st: Pt, en: Pt) -> bool {
    cross_at(st, en, p) > 1e-9
}

/// True if `p` is on or left of the directed line `st -> en`.
pub fn is_left_of(p: Pt, st: Pt, en: Pt) -> bool {
    cross_at(st, en, p) >= -1e-9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_of() {
        let st = Pt::new(0.0, 0.0);
        let en = Pt::new(1.0, 0.0);
        assert!(is_strictly_left_of(Pt::new(0.5, 1.0), st, en));
        assert!(!is_strictly_left_of(Pt::new(0.5, -1.0), st, en));
    }
}
