use serde::{Deserialize, Serialize};

use crate::geom::point::PtI;

/// Axis-aligned box in board-integer coordinates. `lo <= hi` component-wise
/// for a non-empty box; empty boxes use the sentinel `lo.x > hi.x`.
///
/// Used pervasively: spatial index leaves and inner-node unions, board
/// outline/keep-out overlap checks, and room bounding boxes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntBox {
    pub lo: PtI,
    pub hi: PtI,
}

impl IntBox {
    pub const fn new(lo: PtI, hi: PtI) -> Self {
        Self { lo, hi }
    }

    pub fn empty() -> Self {
        Self::new(PtI::new(1, 1), PtI::new(0, 0))
    }

    pub fn is_empty(&self) -> bool {
        self.lo.x > self.hi.x || self.lo.y > self.hi.y
    }

    pub fn enclosing(a: PtI, b: PtI) -> Self {
        Self::new(PtI::new(a.x.min(b.x), a.y.min(b.y)), PtI::new(a.x.max(b.x), a.y.max(b.y)))
    }

    pub fn from_points(pts: impl IntoIterator<Item = PtI>) -> Self {
        let mut it = pts.into_iter();
        let Some(first) = it.next() else { return Self::empty() };
        let mut b = Self::new(first, first);
        for p in it {
            b = b.union_with(&Self::new(p, p));
        }
        b
    }

    pub fn width(&self) -> i64 {
        (self.hi.x - self.lo.x).max(0)
    }

    pub fn height(&self) -> i64 {
        (self.hi.y - self.lo.y).max(0)
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() { 0 } else { self.width() * self.height() }
    }

    pub fn center(&self) -> PtI {
        PtI::new((self.lo.x + self.hi.x) / 2, (self.lo.y + self.hi.y) / 2)
    }

    pub fn contains_point(&self, p: PtI) -> bool {
        !self.is_empty()
            && p.x >= self.lo.x
            && p.x <= self.hi.x
            && p.y >= self.lo.y
            && p.y <= self.hi.y
    }

    pub fn contains(&self, o: &IntBox) -> bool {
        !o.is_empty()
            && !self.is_empty()
            && o.lo.x >= self.lo.x
            && o.lo.y >= self.lo.y
            && o.hi.x <= self.hi.x
            && o.hi.y <= self.hi.y
    }

    pub fn intersects(&self, o: &IntBox) -> bool {
        if self.is_empty() || o.is_empty() {
            return false;
        }
        self.lo.x <= o.hi.x && o.lo.x <= self.hi.x && self.lo.y <= o.hi.y && o.lo.y <= self.hi.y
    }

    pub fn intersection(&self, o: &IntBox) -> IntBox {
        if !self.intersects(o) {
            return IntBox::empty();
        }
        IntBox::new(
            PtI::new(self.lo.x.max(o.lo.x), self.lo.y.max(o.lo.y)),
            PtI::new(self.hi.x.min(o.hi.x), self.hi.y.min(o.hi.y)),
        )
    }

    pub fn union_with(&self, o: &IntBox) -> IntBox {
        if self.is_empty() {
            return *o;
        }
        if o.is_empty() {
            return *self;
        }
        IntBox::new(
            PtI::new(self.lo.x.min(o.lo.x), self.lo.y.min(o.lo.y)),
            PtI::new(self.hi.x.max(o.hi.x), self.hi.y.max(o.hi.y)),
        )
    }

    pub fn expand(&self, offset: i64) -> IntBox {
        if self.is_empty() {
            return *self;
        }
        IntBox::new(
            PtI::new(self.lo.x - offset, self.lo.y - offset),
            PtI::new(self.hi.x + offset, self.hi.y + offset),
        )
    }

    /// Area growth if `o` were unioned into self, used by the spatial
    /// index's minimum-area-increase insertion heuristic.
    pub fn area_increase(&self, o: &IntBox) -> i64 {
        self.union_with(o).area() - self.area()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects_and_contains() {
        let a = IntBox::new(PtI::new(0, 0), PtI::new(10, 10));
        let b = IntBox::new(PtI::new(5, 5), PtI::new(15, 15));
        let c = IntBox::new(PtI::new(20, 20), PtI::new(30, 30));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.contains_point(PtI::new(5, 5)));
        assert!(!a.contains(&b));
        assert!(a.contains(&IntBox::new(PtI::new(1, 1), PtI::new(2, 2))));
    }

    #[test]
    fn test_union_and_expand() {
        let a = IntBox::new(PtI::new(0, 0), PtI::new(10, 10));
        let b = IntBox::new(PtI::new(5, 5), PtI::new(20, 8));
        let u = a.union_with(&b);
        assert_eq!(u, IntBox::new(PtI::new(0, 0), PtI::new(20, 10)));
        assert_eq!(a.expand(2), IntBox::new(PtI::new(-2, -2), PtI::new(12, 12)));
    }

    #[test]
    fn test_empty_box() {
        let e = IntBox::empty();
        assert!(e.is_empty());
        let a = IntBox::new(PtI::new(0, 0), PtI::new(10, 10));
        assert_eq!(a.union_with(&e), a);
        assert!(!a.intersects(&e));
    }
}
