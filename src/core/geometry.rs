//! Affine matrix and point helpers shared by the interpreter and the
//! spatial analysis stages.

/// A 2x3 affine transform, column-major `[a b c d e f]`:
///
/// ```text
/// x' = a*x + c*y + e
/// y' = b*x + d*y + f
/// ```
pub type Matrix = [f64; 6];

pub const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// Builds a translation matrix `[1 0 0 1 tx ty]`.
pub fn translate(tx: f64, ty: f64) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

/// Composes two matrices such that applying the result to a point is
/// equivalent to applying `first` and then `second` (row-vector
/// convention: `p' = p * first * second`). This is the same
/// pre-multiplication `cm` performs on the CTM.
pub fn multiply(first: Matrix, second: Matrix) -> Matrix {
    let [a1, b1, c1, d1, e1, f1] = first;
    let [a2, b2, c2, d2, e2, f2] = second;
    [
        a1 * a2 + b1 * c2,
        a1 * b2 + b1 * d2,
        c1 * a2 + d1 * c2,
        c1 * b2 + d1 * d2,
        e1 * a2 + f1 * c2 + e2,
        e1 * b2 + f1 * d2 + f2,
    ]
}

/// Applies a matrix to a point.
pub fn apply(m: Matrix, p: Point) -> Point {
    Point {
        x: m[0] * p.x + m[2] * p.y + m[4],
        y: m[1] * p.x + m[3] * p.y + m[5],
    }
}

/// The translation component of a matrix, i.e. `apply(m, Point::new(0.0, 0.0))`.
pub fn origin(m: Matrix) -> Point {
    Point { x: m[4], y: m[5] }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_apply_is_noop() {
        let p = Point::new(12.0, -4.0);
        assert_eq!(apply(IDENTITY, p), p);
    }

    #[test]
    fn test_translate_moves_origin() {
        let m = translate(10.0, 20.0);
        assert_eq!(origin(m), Point::new(10.0, 20.0));
    }

    #[test]
    fn test_multiply_applies_first_then_second() {
        let first = translate(5.0, 0.0);
        let second = translate(0.0, 7.0);
        let combined = multiply(first, second);
        assert_eq!(apply(combined, Point::new(0.0, 0.0)), Point::new(5.0, 7.0));
    }

    #[test]
    fn test_multiply_with_identity_is_noop() {
        let m = [2.0, 0.0, 0.0, 3.0, 1.0, 1.0];
        assert_eq!(multiply(m, IDENTITY), m);
        assert_eq!(multiply(IDENTITY, m), m);
    }

    #[test]
    fn test_scale_then_translate_order_matters() {
        let scale = [2.0, 0.0, 0.0, 2.0, 0.0, 0.0];
        let shift = translate(100.0, 0.0);
        // scale applied first, then shift: p=(1,0) -> (2,0) -> (102,0)
        let combined = multiply(scale, shift);
        assert_eq!(apply(combined, Point::new(1.0, 0.0)), Point::new(102.0, 0.0));
    }
}
