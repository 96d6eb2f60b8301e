use approx::{AbsDiffEq, RelativeEq};
use auto_ops::{impl_op_ex, impl_op_ex_commutative};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A geometric point used by shapes, lines and the room/door machinery.
/// Room restraining produces non-lattice intersection points, so shape
/// geometry is carried in floating point; board-level positions are carried
/// as [`PtI`] and converted with [`PtI::to_pt`].
#[derive(Debug, Default, PartialEq, Copy, Clone, Display, Serialize, Deserialize)]
#[display(fmt = "({}, {})", x, y)]
pub struct Pt {
    pub x: f64,
    pub y: f64,
}

impl Pt {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn dot(&self, o: Pt) -> f64 {
        self.x * o.x + self.y * o.y
    }

    pub fn cross(&self, o: Pt) -> f64 {
        self.x * o.y - self.y * o.x
    }

    pub fn mag2(&self) -> f64 {
        self.dot(*self)
    }

    pub fn mag(&self) -> f64 {
        self.mag2().sqrt()
    }

    pub fn dist(&self, o: Pt) -> f64 {
        (o - *self).mag()
    }

    pub fn norm(&self) -> Pt {
        let mag = self.mag();
        if mag == 0.0 { *self } else { *self / mag }
    }

    pub fn lerp(&self, o: Pt, t: f64) -> Pt {
        *self + (o - *self) * t
    }
}

impl AbsDiffEq for Pt {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, o: &Self, epsilon: f64) -> bool {
        f64::abs_diff_eq(&self.x, &o.x, epsilon) && f64::abs_diff_eq(&self.y, &o.y, epsilon)
    }
}

impl RelativeEq for Pt {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, o: &Self, epsilon: f64, max_relative: f64) -> bool {
        f64::relative_eq(&self.x, &o.x, epsilon, max_relative)
            && f64::relative_eq(&self.y, &o.y, epsilon, max_relative)
    }
}

impl_op_ex!(-|a: &Pt| -> Pt { Pt::new(-a.x, -a.y) });
impl_op_ex!(+ |a: &Pt, b: &Pt| -> Pt { Pt::new(a.x + b.x, a.y + b.y) });
impl_op_ex!(+= |a: &mut Pt, b: &Pt| { a.x += b.x; a.y += b.y; });
impl_op_ex!(-|a: &Pt, b: &Pt| -> Pt { Pt::new(a.x - b.x, a.y - b.y) });
impl_op_ex!(-= |a: &mut Pt, b: &Pt| { a.x -= b.x; a.y -= b.y; });
impl_op_ex_commutative!(*|a: &Pt, b: &f64| -> Pt { Pt::new(a.x * b, a.y * b) });
impl_op_ex!(/|a: &Pt, b: &f64| -> Pt { Pt::new(a.x / b, a.y / b) });

/// Fixed board-integer coordinate. Resolution is typically 10,000 units per
/// mm; coordinates must stay within +/- 2^25 so that pairwise products fit
/// comfortably in i64 and in an f64 mantissa.
#[derive(Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Copy, Clone, Display, Serialize, Deserialize)]
#[display(fmt = "({}, {})", x, y)]
pub struct PtI {
    pub x: i64,
    pub y: i64,
}

pub const COORD_BOUND: i64 = 1 << 25;

impl PtI {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::new(0, 0)
    }

    pub fn in_bounds(&self) -> bool {
        self.x.unsigned_abs() < COORD_BOUND as u64 && self.y.unsigned_abs() < COORD_BOUND as u64
    }

    pub fn to_pt(self) -> Pt {
        Pt::new(self.x as f64, self.y as f64)
    }

    /// Squared Euclidean distance, computed in i64: safe given [`COORD_BOUND`].
    pub fn dist2(&self, o: PtI) -> i64 {
        let dx = o.x - self.x;
        let dy = o.y - self.y;
        dx * dx + dy * dy
    }

    pub fn dist(&self, o: PtI) -> f64 {
        (self.dist2(o) as f64).sqrt()
    }
}

impl_op_ex!(-|a: &PtI| -> PtI { PtI::new(-a.x, -a.y) });
impl_op_ex!(+ |a: &PtI, b: &PtI| -> PtI { PtI::new(a.x + b.x, a.y + b.y) });
impl_op_ex!(+= |a: &mut PtI, b: &PtI| { a.x += b.x; a.y += b.y; });
impl_op_ex!(-|a: &PtI, b: &PtI| -> PtI { PtI::new(a.x - b.x, a.y - b.y) });
impl_op_ex!(-= |a: &mut PtI, b: &PtI| { a.x -= b.x; a.y -= b.y; });
impl_op_ex_commutative!(*|a: &PtI, b: &i64| -> PtI { PtI::new(a.x * b, a.y * b) });
