use cgmath::{BaseFloat, InnerSpace, Point2, Vector2};
use num_traits::Float;

pub type Line2f = Line2<f32>;

/// A directed line through `origin`. `displace` is kept exactly as given (not
/// normalized), so `side_cross` reproduces the integer arithmetic of the map
/// format when fed map coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Line2<S> {
    pub origin: Point2<S>,
    pub displace: Vector2<S>,
}

impl<S: BaseFloat> Line2<S> {
    pub fn from_origin_and_displace(origin: Point2<S>, displace: Vector2<S>) -> Line2<S> {
        Line2 { origin, displace }
    }

    pub fn from_two_points(origin: Point2<S>, towards: Point2<S>) -> Line2<S> {
        Self::from_origin_and_displace(origin, towards - origin)
    }

    pub fn inverted_halfspaces(&self) -> Line2<S> {
        Line2 {
            origin: self.origin,
            displace: -self.displace,
        }
    }

    /// Cross product of `displace` and `point - origin`. Positive when `point`
    /// lies counter-clockwise of the direction of travel.
    pub fn side_cross(&self, point: Point2<S>) -> S {
        self.displace.perp_dot(point - self.origin)
    }

    pub fn length(&self) -> S {
        self.displace.magnitude()
    }

    pub fn is_degenerate(&self) -> bool {
        self.length() <= <S as Float>::epsilon()
    }

    pub fn at_offset(&self, offset: S) -> Point2<S> {
        self.origin + self.displace * offset
    }
}
