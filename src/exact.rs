//! Exact numeric kernel.
//!
//! Every coordinate inside the Boolean pipeline is a [`BigRational`]. Finite IEEE
//! floats are dyadic rationals, so [`cast_to_exact`] is lossless, and every
//! predicate below returns the exact sign. Only [`assign_scalar`] rounds, once,
//! on the way back out.
//!
//! Points carry an `f64` shadow of their coordinates. [`orient2d`] and
//! [`orient3d`] try the shadow first: inputs that are plain doubles go through
//! Shewchuk's adaptive predicates from `robust`, anything else through a static
//! error bound. Only signs the filter cannot certify are recomputed in rationals.

use crate::float_types::Real;
use nalgebra::Point3;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::ops::Index;

/// The exact scalar used throughout the pipeline.
pub type Exact = BigRational;

/// A free vector in exact coordinates.
pub type ExactVector = [Exact; 3];

/// Largest magnitude a shadow coordinate may have for the float filters.
/// Keeps every product in the determinants far from overflow.
const SHADOW_LIMIT: f64 = 1e60;

/// Smallest nonzero magnitude `robust` gets to see; below it intermediate
/// products could underflow.
const PLAIN_FLOOR: f64 = 1e-60;

/// Absolute slack covering underflow in the static filters.
const UNDERFLOW_SLACK: f64 = 1e-280;

const ORIENT2D_BOUND: f64 = 16.0 * f64::EPSILON;
const ORIENT3D_BOUND: f64 = 32.0 * f64::EPSILON;

/// `f64` approximation of an exact scalar and whether it is the value itself.
fn shadow(value: &Exact) -> (f64, bool) {
    match value.to_f64() {
        Some(approx) if approx.is_finite() && approx.abs() < SHADOW_LIMIT => {
            let plain = (approx == 0.0 || approx.abs() > PLAIN_FLOOR)
                && Exact::from_float(approx).is_some_and(|back| back == *value);
            (approx, plain)
        }
        _ => (f64::NAN, false),
    }
}

/// A 3D point with exact rational coordinates.
///
/// `Eq`, `Hash` and `Ord` only look at the exact coordinates. `Ord` is
/// lexicographic on `(x, y, z)`, which the cell extractor relies on to find an
/// extreme vertex.
#[derive(Debug, Clone)]
pub struct ExactPoint {
    coords: [Exact; 3],
    approx: [f64; 3],
    plain: [bool; 3],
}

impl ExactPoint {
    pub fn new(x: Exact, y: Exact, z: Exact) -> Self {
        Self::from_coords([x, y, z])
    }

    pub fn from_coords(coords: [Exact; 3]) -> Self {
        let shadows = coords.each_ref().map(shadow);
        Self {
            approx: shadows.map(|(approx, _)| approx),
            plain: shadows.map(|(_, plain)| plain),
            coords,
        }
    }

    pub fn from_integers(x: i64, y: i64, z: i64) -> Self {
        Self::new(int(x), int(y), int(z))
    }

    #[inline]
    pub fn coords(&self) -> &[Exact; 3] {
        &self.coords
    }

    #[inline]
    pub fn coord(&self, axis: usize) -> &Exact {
        &self.coords[axis]
    }

    #[inline]
    pub fn x(&self) -> &Exact {
        &self.coords[0]
    }

    #[inline]
    pub fn y(&self) -> &Exact {
        &self.coords[1]
    }

    #[inline]
    pub fn z(&self) -> &Exact {
        &self.coords[2]
    }

    /// `f64` shadow of the coordinates; NaN where a coordinate is out of range.
    #[inline]
    pub fn approx(&self) -> [f64; 3] {
        self.approx
    }

    /// Whether every coordinate is exactly its `f64` shadow.
    #[inline]
    pub fn is_plain(&self) -> bool {
        self.plain.iter().all(|&plain| plain)
    }

    /// `self + v`
    pub fn translated(&self, v: &ExactVector) -> Self {
        Self::new(&self.coords[0] + &v[0], &self.coords[1] + &v[1], &self.coords[2] + &v[2])
    }

    /// `self + t * (other - self)`
    pub fn lerp(&self, other: &ExactPoint, t: &Exact) -> Self {
        let d = sub(other, self);
        Self::new(
            &self.coords[0] + t * &d[0],
            &self.coords[1] + t * &d[1],
            &self.coords[2] + t * &d[2],
        )
    }

    /// Drop `axis` and keep the other two coordinates in cyclic order
    /// (`axis + 1`, `axis + 2`). Cyclic order keeps the sign of `orient2d` equal to
    /// the sign of the dropped component of a triangle normal.
    pub fn project(&self, axis: usize) -> ExactPoint2 {
        let (i, j) = ((axis + 1) % 3, (axis + 2) % 3);
        ExactPoint2 {
            coords: [self.coords[i].clone(), self.coords[j].clone()],
            approx: [self.approx[i], self.approx[j]],
            plain: self.plain[i] && self.plain[j],
        }
    }

    pub fn to_real(&self, exact_output: bool) -> Point3<Real> {
        Point3::new(
            assign_scalar(&self.coords[0], exact_output),
            assign_scalar(&self.coords[1], exact_output),
            assign_scalar(&self.coords[2], exact_output),
        )
    }
}

impl PartialEq for ExactPoint {
    fn eq(&self, other: &Self) -> bool {
        self.coords == other.coords
    }
}

impl Eq for ExactPoint {}

impl Hash for ExactPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.coords.hash(state);
    }
}

impl PartialOrd for ExactPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ExactPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.coords.cmp(&other.coords)
    }
}

impl Index<usize> for ExactPoint {
    type Output = Exact;

    #[inline]
    fn index(&self, axis: usize) -> &Exact {
        &self.coords[axis]
    }
}

/// A point on one of the coordinate planes, with the same `f64` shadow as
/// [`ExactPoint`].
#[derive(Debug, Clone)]
pub struct ExactPoint2 {
    coords: [Exact; 2],
    approx: [f64; 2],
    plain: bool,
}

impl ExactPoint2 {
    pub fn new(x: Exact, y: Exact) -> Self {
        let (sx, px) = shadow(&x);
        let (sy, py) = shadow(&y);
        Self { coords: [x, y], approx: [sx, sy], plain: px && py }
    }

    #[inline]
    pub fn approx(&self) -> [f64; 2] {
        self.approx
    }
}

impl PartialEq for ExactPoint2 {
    fn eq(&self, other: &Self) -> bool {
        self.coords == other.coords
    }
}

impl Eq for ExactPoint2 {}

impl Index<usize> for ExactPoint2 {
    type Output = Exact;

    #[inline]
    fn index(&self, axis: usize) -> &Exact {
        &self.coords[axis]
    }
}

/// Integer literal as an exact scalar.
#[inline]
pub fn int(value: i64) -> Exact {
    Exact::from_integer(BigInt::from(value))
}

/// `a - b`
pub fn sub(a: &ExactPoint, b: &ExactPoint) -> ExactVector {
    [&a[0] - &b[0], &a[1] - &b[1], &a[2] - &b[2]]
}

pub fn dot(a: &ExactVector, b: &ExactVector) -> Exact {
    &a[0] * &b[0] + &a[1] * &b[1] + &a[2] * &b[2]
}

pub fn cross(a: &ExactVector, b: &ExactVector) -> ExactVector {
    [
        &a[1] * &b[2] - &a[2] * &b[1],
        &a[2] * &b[0] - &a[0] * &b[2],
        &a[0] * &b[1] - &a[1] * &b[0],
    ]
}

pub fn is_zero_vector(v: &ExactVector) -> bool {
    v.iter().all(Zero::is_zero)
}

/// Unnormalized normal `(b - a) x (c - a)`; zero for degenerate triangles.
pub fn triangle_normal(a: &ExactPoint, b: &ExactPoint, c: &ExactPoint) -> ExactVector {
    cross(&sub(b, a), &sub(c, a))
}

/// Whether `abc` spans no area. Each projected orientation is one component
/// of the normal, so this never builds the normal itself.
pub fn is_degenerate(a: &ExactPoint, b: &ExactPoint, c: &ExactPoint) -> bool {
    (0..3).all(|axis| orient2d(&a.project(axis), &b.project(axis), &c.project(axis)) == Ordering::Equal)
}

/// `((b - a) x (c - a)) . (d - a)`, six times the signed volume of `abcd`.
pub fn orient3d_value(a: &ExactPoint, b: &ExactPoint, c: &ExactPoint, d: &ExactPoint) -> Exact {
    dot(&triangle_normal(a, b, c), &sub(d, a))
}

/// Which side of the oriented plane `abc` the point `d` is on.
/// `Greater` means the side the normal `(b - a) x (c - a)` points to.
pub fn orient3d(a: &ExactPoint, b: &ExactPoint, c: &ExactPoint, d: &ExactPoint) -> Ordering {
    if a.is_plain() && b.is_plain() && c.is_plain() && d.is_plain() {
        let coord = |p: &ExactPoint| {
            let [x, y, z] = p.approx();
            robust::Coord3D { x, y, z }
        };
        let det = robust::orient3d(coord(a), coord(b), coord(c), coord(d));
        if det.is_finite() {
            // robust is positive below the plane
            return float_sign(det).reverse();
        }
    }
    orient3d_filter(a, b, c, d).unwrap_or_else(|| sign(&orient3d_value(a, b, c, d)))
}

/// Static-bound float evaluation of [`orient3d`]; `None` when the sign is not
/// certain.
fn orient3d_filter(a: &ExactPoint, b: &ExactPoint, c: &ExactPoint, d: &ExactPoint) -> Option<Ordering> {
    let origin = a.approx();
    let row = |p: &ExactPoint| {
        let q = p.approx();
        [q[0] - origin[0], q[1] - origin[1], q[2] - origin[2]]
    };
    let magnitude = |p: &ExactPoint| {
        let q = p.approx();
        [
            q[0].abs() + origin[0].abs(),
            q[1].abs() + origin[1].abs(),
            q[2].abs() + origin[2].abs(),
        ]
    };
    let (u, v, w) = (row(b), row(c), row(d));
    let (mu, mv, mw) = (magnitude(b), magnitude(c), magnitude(d));

    let det = u[0] * (v[1] * w[2] - v[2] * w[1])
        + u[1] * (v[2] * w[0] - v[0] * w[2])
        + u[2] * (v[0] * w[1] - v[1] * w[0]);
    let permanent = mu[0] * (mv[1] * mw[2] + mv[2] * mw[1])
        + mu[1] * (mv[2] * mw[0] + mv[0] * mw[2])
        + mu[2] * (mv[0] * mw[1] + mv[1] * mw[0]);
    certain_sign(det, ORIENT3D_BOUND * permanent)
}

/// Twice the signed area of the 2D triangle `abc`.
pub fn orient2d_value(a: &ExactPoint2, b: &ExactPoint2, c: &ExactPoint2) -> Exact {
    (&b[0] - &a[0]) * (&c[1] - &a[1]) - (&b[1] - &a[1]) * (&c[0] - &a[0])
}

/// `Greater` when `abc` turns counter-clockwise.
pub fn orient2d(a: &ExactPoint2, b: &ExactPoint2, c: &ExactPoint2) -> Ordering {
    if a.plain && b.plain && c.plain {
        let coord = |p: &ExactPoint2| {
            let [x, y] = p.approx;
            robust::Coord { x, y }
        };
        let det = robust::orient2d(coord(a), coord(b), coord(c));
        if det.is_finite() {
            return float_sign(det);
        }
    }
    orient2d_filter(a, b, c).unwrap_or_else(|| sign(&orient2d_value(a, b, c)))
}

fn orient2d_filter(a: &ExactPoint2, b: &ExactPoint2, c: &ExactPoint2) -> Option<Ordering> {
    let ([ax, ay], [bx, by], [cx, cy]) = (a.approx, b.approx, c.approx);
    let det = (bx - ax) * (cy - ay) - (by - ay) * (cx - ax);
    let permanent = (bx.abs() + ax.abs()) * (cy.abs() + ay.abs()) + (by.abs() + ay.abs()) * (cx.abs() + ax.abs());
    certain_sign(det, ORIENT2D_BOUND * permanent)
}

/// Sign of `det` when it clears `bound`. NaN shadows fail every comparison and
/// fall through to `None`.
fn certain_sign(det: f64, bound: f64) -> Option<Ordering> {
    if !(det.is_finite() && bound.is_finite()) {
        return None;
    }
    let bound = bound + UNDERFLOW_SLACK;
    if det > bound {
        Some(Ordering::Greater)
    } else if det < -bound {
        Some(Ordering::Less)
    } else {
        None
    }
}

#[inline]
fn float_sign(value: f64) -> Ordering {
    if value > 0.0 {
        Ordering::Greater
    } else if value < 0.0 {
        Ordering::Less
    } else {
        Ordering::Equal
    }
}

#[inline]
pub fn sign(value: &Exact) -> Ordering {
    if value.is_positive() {
        Ordering::Greater
    } else if value.is_negative() {
        Ordering::Less
    } else {
        Ordering::Equal
    }
}

/// Index of the component with the largest magnitude (lowest index on ties).
pub fn dominant_axis(v: &ExactVector) -> usize {
    let mut best = 0;
    for axis in 1..3 {
        if v[axis].abs() > v[best].abs() {
            best = axis;
        }
    }
    best
}

/// Lossless conversion of a floating point position; `None` for NaN or infinity.
pub fn cast_to_exact(p: &Point3<Real>) -> Option<ExactPoint> {
    Some(ExactPoint::new(
        Exact::from_float(p.x)?,
        Exact::from_float(p.y)?,
        Exact::from_float(p.z)?,
    ))
}

/// Convert an exact value back to `Real`.
///
/// With `exact_output` the result is the `Real` nearest to `value`, rounded
/// once. Without it the numerator and denominator are converted separately and
/// divided, which is faster and at most a few ulps off; values too large for
/// that shortcut fall back to the exact path.
pub fn assign_scalar(value: &Exact, exact_output: bool) -> Real {
    if !exact_output {
        if let (Some(n), Some(d)) = (value.numer().to_f64(), value.denom().to_f64()) {
            let quick = n / d;
            if quick.is_finite() {
                return quick as Real;
            }
        }
    }
    nearest(value).unwrap_or(Real::NAN)
}

#[cfg(feature = "f64")]
fn nearest(value: &Exact) -> Option<Real> {
    value.to_f64()
}

/// `to_f64` followed by `as f32` rounds twice. The second rounding only goes
/// wrong when the first one lands exactly halfway between two `f32`s, so
/// that case is settled against the exact value.
#[cfg(feature = "f32")]
fn nearest(value: &Exact) -> Option<Real> {
    let wide = value.to_f64()?;
    let narrow = wide as f32;
    if !narrow.is_finite() || f64::from(narrow) == wide {
        return Some(narrow);
    }
    let other = neighbour(narrow, f64::from(narrow) < wide);
    let midpoint = (f64::from(narrow) + f64::from(other)) / 2.0;
    if wide != midpoint {
        return Some(narrow);
    }
    Some(match value.cmp(&Exact::from_float(midpoint)?) {
        Ordering::Equal => narrow,
        Ordering::Greater => narrow.max(other),
        Ordering::Less => narrow.min(other),
    })
}

/// Adjacent finite `f32` above (`up`) or below `x`.
#[cfg(feature = "f32")]
fn neighbour(x: f32, up: bool) -> f32 {
    if x == 0.0 {
        let tiny = f32::from_bits(1);
        return if up { tiny } else { -tiny };
    }
    let bits = x.to_bits();
    if (x > 0.0) == up {
        f32::from_bits(bits + 1)
    } else {
        f32::from_bits(bits - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i64, y: i64, z: i64) -> ExactPoint {
        ExactPoint::from_integers(x, y, z)
    }

    fn third() -> Exact {
        Exact::new(BigInt::from(1), BigInt::from(3))
    }

    #[test]
    fn orient3d_follows_right_hand_rule() {
        let (a, b, c) = (p(0, 0, 0), p(1, 0, 0), p(0, 1, 0));
        assert_eq!(orient3d(&a, &b, &c, &p(0, 0, 1)), Ordering::Greater);
        assert_eq!(orient3d(&a, &b, &c, &p(3, 3, -1)), Ordering::Less);
        assert_eq!(orient3d(&a, &b, &c, &p(7, -2, 0)), Ordering::Equal);
    }

    #[test]
    fn orient2d_sign_matches_projected_normal() {
        let (a, b, c) = (p(0, 0, 0), p(0, 1, 0), p(0, 0, 1));
        let n = triangle_normal(&a, &b, &c);
        let axis = dominant_axis(&n);
        assert_eq!(axis, 0);
        let orientation = orient2d(&a.project(axis), &b.project(axis), &c.project(axis));
        assert_eq!(orientation, sign(&n[axis]));
    }

    #[test]
    fn filtered_predicates_agree_with_rationals() {
        // thirds are not doubles, so these go through the static filter or the
        // rational fallback instead of robust
        let t = third();
        let a = ExactPoint::new(t.clone(), int(0), int(0));
        let b = ExactPoint::new(int(1), t.clone(), int(0));
        let c = ExactPoint::new(int(0), int(1), t.clone());
        assert!(!a.is_plain());
        let samples = [
            ExactPoint::new(t.clone(), t.clone(), t.clone()),
            ExactPoint::new(int(1), int(1), int(1)),
            ExactPoint::new(int(-2), t.clone(), int(5)),
            a.lerp(&b, &t),
            b.lerp(&c, &Exact::new(BigInt::from(2), BigInt::from(7))),
        ];
        for d in &samples {
            assert_eq!(orient3d(&a, &b, &c, d), sign(&orient3d_value(&a, &b, &c, d)));
            for axis in 0..3 {
                let (pa, pb, pd) = (a.project(axis), b.project(axis), d.project(axis));
                assert_eq!(orient2d(&pa, &pb, &pd), sign(&orient2d_value(&pa, &pb, &pd)));
            }
        }
        // points on an edge are exactly coplanar and collinear
        assert_eq!(orient3d(&a, &b, &c, &samples[3]), Ordering::Equal);
        assert!(is_degenerate(&a, &b, &samples[3]));
        assert!(!is_degenerate(&a, &b, &c));
    }

    #[test]
    fn nearly_flat_double_inputs_are_decided_exactly() {
        let a = cast_to_exact(&Point3::new(0.1, 0.2, 0.3)).unwrap();
        let b = cast_to_exact(&Point3::new(1.1, 0.7, -0.4)).unwrap();
        let c = cast_to_exact(&Point3::new(-0.6, 1.3, 0.9)).unwrap();
        assert!(a.is_plain() && b.is_plain() && c.is_plain());
        let half = Exact::new(BigInt::from(1), BigInt::from(2));
        let on_plane = a.lerp(&b, &half);
        let nudge = [Exact::new(BigInt::from(1), BigInt::from(1) << 200), int(0), int(0)];
        for d in [on_plane.translated(&nudge), on_plane] {
            assert_eq!(orient3d(&a, &b, &c, &d), sign(&orient3d_value(&a, &b, &c, &d)));
        }
    }

    #[test]
    fn out_of_range_shadows_fall_back() {
        let huge = Exact::from_integer(BigInt::from(1) << 2000);
        let a = ExactPoint::new(huge.clone(), int(0), int(0));
        assert!(a.approx()[0].is_nan());
        let (b, c) = (p(0, 1, 0), p(0, 0, 1));
        assert_eq!(orient3d(&a, &b, &c, &p(0, 0, 0)), sign(&orient3d_value(&a, &b, &c, &p(0, 0, 0))));
    }

    #[test]
    fn equality_ignores_the_shadow() {
        let from_float = cast_to_exact(&Point3::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(from_float, p(1, 2, 3));
        assert_eq!(p(1, 2, 3).cmp(&p(1, 2, 4)), Ordering::Less);
    }

    #[test]
    fn cast_is_lossless_for_non_dyadic_decimals() {
        let q = cast_to_exact(&Point3::new(0.1, -2.5, 1e-30)).unwrap();
        assert_eq!(q.to_real(true), Point3::new(0.1, -2.5, 1e-30));
        assert!(cast_to_exact(&Point3::new(Real::NAN, 0.0, 0.0)).is_none());
    }

    #[test]
    fn assign_scalar_rounds_thirds() {
        assert_eq!(assign_scalar(&third(), true), 1.0 / 3.0);
        assert!((assign_scalar(&third(), false) - 1.0 / 3.0).abs() <= Real::EPSILON);
    }

    #[test]
    fn assign_scalar_rounds_once() {
        // a hair above the midpoint between 1 and the next f32; the nearest
        // f64 is that midpoint exactly
        let value = int(1)
            + Exact::new(BigInt::from(1), BigInt::from(1) << 24)
            + Exact::new(BigInt::from(1), BigInt::from(1) << 60);
        #[cfg(feature = "f32")]
        assert_eq!(assign_scalar(&value, true), 1.0 + f32::EPSILON);
        #[cfg(feature = "f64")]
        assert_eq!(assign_scalar(&value, true), 1.0 + 2f64.powi(-24));

        let below = int(1) + Exact::new(BigInt::from(1), BigInt::from(1) << 24)
            - Exact::new(BigInt::from(1), BigInt::from(1) << 60);
        #[cfg(feature = "f32")]
        assert_eq!(assign_scalar(&below, true), 1.0);
        #[cfg(feature = "f64")]
        assert_eq!(assign_scalar(&below, true), 1.0 + 2f64.powi(-24));
    }

    #[test]
    fn lerp_stays_exact() {
        let half = Exact::new(BigInt::from(1), BigInt::from(2));
        assert_eq!(p(0, 0, 0).lerp(&p(2, 4, 6), &half), p(1, 2, 3));
    }
}
