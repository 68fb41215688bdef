//! Triangulation of simple polygons: a fan for convex ones, ear clipping for
//! the rest.

use super::errors::{ErrorKind, Result};
use error_chain::bail;
use log::trace;
use math::{Pnt2f, Vec2f};
use serde::Deserialize;

const COLINEAR_EPSILON: f32 = 1e-6;
const MAX_STALLED_PASSES: usize = 3;

/// Maps any signed index onto `[0, len)`, wrapping in both directions.
pub fn wrap_index(index: isize, len: usize) -> usize {
    index.rem_euclid(len as isize) as usize
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Turn {
    Left,
    Right,
    Colinear,
}

impl Turn {
    pub fn at(previous: Pnt2f, current: Pnt2f, next: Pnt2f) -> Turn {
        let cross = (current - previous).perp_dot(next - current);
        if cross > COLINEAR_EPSILON {
            Turn::Left
        } else if cross < -COLINEAR_EPSILON {
            Turn::Right
        } else {
            Turn::Colinear
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Winding {
    Clockwise,
    CounterClockwise,
}

impl Winding {
    /// Sign of the shoelace sum `Σ (x2 - x1) * (y2 + y1)`; zero counts as
    /// clockwise.
    pub fn of(points: &[Pnt2f]) -> Winding {
        let len = points.len();
        let sum: f32 = (0..len)
            .map(|i| {
                let (a, b) = (points[i], points[(i + 1) % len]);
                (b.x - a.x) * (b.y + a.y)
            })
            .sum();
        if sum >= 0.0 {
            Winding::Clockwise
        } else {
            Winding::CounterClockwise
        }
    }

    /// The turn made at a convex corner of a polygon with this winding.
    pub fn convex_turn(self) -> Turn {
        match self {
            Winding::Clockwise => Turn::Right,
            Winding::CounterClockwise => Turn::Left,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    Convex,
    Concave,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnTally {
    pub left: usize,
    pub right: usize,
    pub colinear: usize,
}

impl TurnTally {
    pub fn of(points: &[Pnt2f]) -> TurnTally {
        let mut tally = TurnTally::default();
        let len = points.len();
        for i in 0..len {
            let previous = points[wrap_index(i as isize - 1, len)];
            let next = points[wrap_index(i as isize + 1, len)];
            match Turn::at(previous, points[i], next) {
                Turn::Left => tally.left += 1,
                Turn::Right => tally.right += 1,
                Turn::Colinear => tally.colinear += 1,
            }
        }
        tally
    }

    pub fn shape(&self) -> Shape {
        if self.left == 0 || self.right == 0 {
            Shape::Convex
        } else {
            Shape::Concave
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TriangulateOptions {
    pub remove_colinear: bool,
    pub normalize_winding: bool,
    /// Map units covered by one repeat of a texture.
    pub uv_scale: f32,
}

impl Default for TriangulateOptions {
    fn default() -> Self {
        TriangulateOptions {
            remove_colinear: true,
            normalize_winding: true,
            uv_scale: 64.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Triangulation {
    pub points: Vec<Pnt2f>,
    pub uvs: Vec<Vec2f>,
    pub triangles: Vec<[u32; 3]>,
    pub shape: Shape,
    pub winding: Winding,
}

impl Triangulation {
    pub fn area(&self) -> f32 {
        self.triangles
            .iter()
            .map(|triangle| {
                let [a, b, c] = self.corners(triangle);
                (b - a).perp_dot(c - a).abs() * 0.5
            })
            .sum()
    }

    pub fn corners(&self, triangle: &[u32; 3]) -> [Pnt2f; 3] {
        [
            self.points[triangle[0] as usize],
            self.points[triangle[1] as usize],
            self.points[triangle[2] as usize],
        ]
    }
}

/// Drops colinear vertices until none are left. Removing one can make its
/// neighbours colinear, so this repeats until nothing changes.
pub fn remove_colinear(points: &mut Vec<Pnt2f>) {
    let mut index = 0;
    let mut unchanged = 0;
    while points.len() >= 3 && unchanged < points.len() {
        let len = points.len();
        let index_in_range = index % len;
        let previous = points[wrap_index(index_in_range as isize - 1, len)];
        let next = points[wrap_index(index_in_range as isize + 1, len)];
        if Turn::at(previous, points[index_in_range], next) == Turn::Colinear {
            points.remove(index_in_range);
            unchanged = 0;
            index = index_in_range;
        } else {
            unchanged += 1;
            index = index_in_range + 1;
        }
    }
}

pub fn triangulate(points: &[Pnt2f], options: &TriangulateOptions) -> Result<Triangulation> {
    if points.is_empty() {
        bail!(ErrorKind::NullInput);
    }
    let mut points = points.to_vec();
    if options.remove_colinear {
        remove_colinear(&mut points);
    }
    if points.len() < 3 {
        bail!(ErrorKind::TooFewVertices(points.len()));
    }

    let mut winding = Winding::of(&points);
    if winding == Winding::CounterClockwise && options.normalize_winding {
        points.reverse();
        winding = Winding::Clockwise;
    }

    let shape = TurnTally::of(&points).shape();
    let triangles = match shape {
        Shape::Convex => fan(points.len()),
        Shape::Concave => clip_ears(&points, winding)?,
    };
    let (points, triangles) = drop_degenerate(points, triangles);
    let uvs = points
        .iter()
        .map(|point| Vec2f::new(point.x, point.y) / options.uv_scale)
        .collect();

    Ok(Triangulation {
        points,
        uvs,
        triangles,
        shape,
        winding,
    })
}

fn fan(len: usize) -> Vec<[u32; 3]> {
    (1..len as u32 - 1).map(|i| [0, i, i + 1]).collect()
}

fn clip_ears(points: &[Pnt2f], winding: Winding) -> Result<Vec<[u32; 3]>> {
    let ear_turn = winding.convex_turn();
    let mut remaining: Vec<usize> = (0..points.len()).collect();
    let mut triangles = Vec::with_capacity(points.len() - 2);
    let mut stalled_passes = 0;

    while remaining.len() > 3 {
        let mut clipped = 0;
        let mut index = 0;
        while index < remaining.len() && remaining.len() > 3 {
            let len = remaining.len();
            let previous = remaining[wrap_index(index as isize - 1, len)];
            let current = remaining[index];
            let next = remaining[wrap_index(index as isize + 1, len)];
            if is_ear(points, &remaining, [previous, current, next], ear_turn) {
                triangles.push([previous as u32, current as u32, next as u32]);
                remaining.remove(index);
                clipped += 1;
            } else {
                index += 1;
            }
        }

        if clipped == 0 {
            stalled_passes += 1;
            trace!(
                "Ear clipping pass made no progress ({} vertices left).",
                remaining.len()
            );
            if stalled_passes >= MAX_STALLED_PASSES {
                bail!(ErrorKind::EarClippingStalled(remaining.len()));
            }
        } else {
            stalled_passes = 0;
        }
    }
    triangles.push([
        remaining[0] as u32,
        remaining[1] as u32,
        remaining[2] as u32,
    ]);
    Ok(triangles)
}

fn is_ear(points: &[Pnt2f], remaining: &[usize], corner: [usize; 3], ear_turn: Turn) -> bool {
    let triangle = [points[corner[0]], points[corner[1]], points[corner[2]]];
    let [a, b, c] = triangle;
    Turn::at(a, b, c) == ear_turn
        && !remaining
            .iter()
            .filter(|&&index| !corner.contains(&index))
            .map(|&index| points[index])
            .filter(|point| !triangle.contains(point))
            .any(|point| inside_or_on_edge(point, triangle))
}

/// All three edge tests agree in sign; points on an edge are outside.
pub fn strictly_inside(point: Pnt2f, [a, b, c]: [Pnt2f; 3]) -> bool {
    let [d1, d2, d3] = edge_sides(point, [a, b, c]);
    (d1 > 0.0 && d2 > 0.0 && d3 > 0.0) || (d1 < 0.0 && d2 < 0.0 && d3 < 0.0)
}

/// Like `strictly_inside`, but points on an edge or a corner count too.
pub fn inside_or_on_edge(point: Pnt2f, [a, b, c]: [Pnt2f; 3]) -> bool {
    let [d1, d2, d3] = edge_sides(point, [a, b, c]);
    (d1 >= 0.0 && d2 >= 0.0 && d3 >= 0.0) || (d1 <= 0.0 && d2 <= 0.0 && d3 <= 0.0)
}

fn edge_sides(point: Pnt2f, [a, b, c]: [Pnt2f; 3]) -> [f32; 3] {
    [
        (b - a).perp_dot(point - a),
        (c - b).perp_dot(point - b),
        (a - c).perp_dot(point - c),
    ]
}

/// Drops triangles whose corners all share an x or all share a y, then drops
/// vertices no remaining triangle uses.
fn drop_degenerate(
    points: Vec<Pnt2f>,
    triangles: Vec<[u32; 3]>,
) -> (Vec<Pnt2f>, Vec<[u32; 3]>) {
    let triangles: Vec<[u32; 3]> = triangles
        .into_iter()
        .filter(|triangle| {
            let [a, b, c] = [
                points[triangle[0] as usize],
                points[triangle[1] as usize],
                points[triangle[2] as usize],
            ];
            let same_x = a.x == b.x && b.x == c.x;
            let same_y = a.y == b.y && b.y == c.y;
            !(same_x || same_y)
        })
        .collect();

    let mut used = vec![false; points.len()];
    for triangle in &triangles {
        for &index in triangle {
            used[index as usize] = true;
        }
    }
    let mut remap = vec![0u32; points.len()];
    let mut kept = Vec::with_capacity(points.len());
    for (index, point) in points.into_iter().enumerate() {
        if used[index] {
            remap[index] = kept.len() as u32;
            kept.push(point);
        }
    }
    let triangles = triangles
        .into_iter()
        .map(|[a, b, c]| [remap[a as usize], remap[b as usize], remap[c as usize]])
        .collect();
    (kept, triangles)
}

#[cfg(test)]
mod test {
    use super::{inside_or_on_edge, strictly_inside, triangulate, wrap_index};
    use super::{Shape, TriangulateOptions, Turn, TurnTally, Winding};
    use crate::errors::ErrorKind;
    use math::Pnt2f;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f32::consts::PI;

    fn regular_polygon(sides: usize, radius: f32) -> Vec<Pnt2f> {
        // Decreasing angles walk clockwise.
        (0..sides)
            .map(|i| {
                let angle = -2.0 * PI * i as f32 / sides as f32;
                Pnt2f::new(radius * angle.cos(), radius * angle.sin())
            })
            .collect()
    }

    fn star(tips: usize) -> Vec<Pnt2f> {
        (0..tips * 2)
            .map(|i| {
                let angle = -PI * i as f32 / tips as f32 + 0.1;
                let radius = if i % 2 == 0 { 10.0 } else { 4.0 };
                Pnt2f::new(radius * angle.cos(), radius * angle.sin())
            })
            .collect()
    }

    fn shoelace_area(points: &[Pnt2f]) -> f32 {
        let len = points.len();
        (0..len)
            .map(|i| {
                let (a, b) = (points[i], points[(i + 1) % len]);
                a.x * b.y - b.x * a.y
            })
            .sum::<f32>()
            .abs()
            * 0.5
    }

    fn l_shape() -> Vec<Pnt2f> {
        [(0, 0), (0, 64), (32, 64), (32, 24), (96, 24), (96, 0)]
            .iter()
            .map(|&(x, y)| Pnt2f::new(x as f32, y as f32))
            .collect()
    }

    #[test]
    fn test_wrap_index() {
        for len in 1..7usize {
            for index in -20..20isize {
                let wrapped = wrap_index(index, len);
                assert!(wrapped < len);
                for k in -3..3isize {
                    assert_eq!(wrap_index(k * len as isize + index, len), wrapped);
                }
            }
        }
        assert_eq!(wrap_index(-1, 4), 3);
        assert_eq!(wrap_index(9, 4), 1);
    }

    #[test]
    fn test_regular_polygons_are_convex() {
        for sides in 3..12 {
            let points = regular_polygon(sides, 100.0);
            assert_eq!(Winding::of(&points), Winding::Clockwise);
            let tally = TurnTally::of(&points);
            assert_eq!(tally.left, 0);
            assert_eq!(tally.right, sides);
            assert_eq!(tally.shape(), Shape::Convex);
        }
    }

    #[test]
    fn test_star_is_concave() {
        let tally = TurnTally::of(&star(5));
        assert_eq!(tally.left, 5);
        assert_eq!(tally.right, 5);
        assert_eq!(tally.shape(), Shape::Concave);
    }

    #[test]
    fn test_fan_area() {
        for sides in 3..12 {
            let points = regular_polygon(sides, 100.0);
            let triangulation = triangulate(&points, &TriangulateOptions::default()).unwrap();
            assert_eq!(triangulation.shape, Shape::Convex);
            assert_eq!(triangulation.triangles.len(), sides - 2);
            let expected = shoelace_area(&points);
            assert!((triangulation.area() - expected).abs() < expected * 1e-4);
        }
    }

    #[test]
    fn test_counter_clockwise_is_normalized() {
        let mut points = regular_polygon(6, 10.0);
        points.reverse();
        assert_eq!(Winding::of(&points), Winding::CounterClockwise);
        let triangulation = triangulate(&points, &TriangulateOptions::default()).unwrap();
        assert_eq!(triangulation.winding, Winding::Clockwise);
        assert_eq!(Winding::of(&triangulation.points), Winding::Clockwise);

        let options = TriangulateOptions {
            normalize_winding: false,
            ..TriangulateOptions::default()
        };
        let triangulation = triangulate(&points, &options).unwrap();
        assert_eq!(triangulation.winding, Winding::CounterClockwise);
        assert_eq!(triangulation.triangles.len(), 4);
    }

    #[test]
    fn test_ear_clipping() {
        for points in vec![star(5), star(7), l_shape()] {
            let triangulation = triangulate(&points, &TriangulateOptions::default()).unwrap();
            assert_eq!(triangulation.shape, Shape::Concave);
            assert!(!triangulation.triangles.is_empty());
            assert!(triangulation.triangles.len() <= points.len() - 2);
            for triangle in &triangulation.triangles {
                let corners = triangulation.corners(triangle);
                for &point in &points {
                    assert!(!strictly_inside(point, corners));
                }
                let [a, b, c] = corners;
                assert_eq!(Turn::at(a, b, c), Turn::Right);
            }
        }

        let points = star(6);
        let triangulation = triangulate(&points, &TriangulateOptions::default()).unwrap();
        let expected = shoelace_area(&points);
        assert!((triangulation.area() - expected).abs() < expected * 1e-3);
    }

    fn grid_points(coords: &[(i32, i32)]) -> Vec<Pnt2f> {
        coords
            .iter()
            .map(|&(x, y)| Pnt2f::new(x as f32, y as f32))
            .collect()
    }

    /// A clockwise polygon on the integer grid, star-shaped around the
    /// origin, or `None` if rounding broke either property.
    fn grid_star(rng: &mut StdRng) -> Option<Vec<Pnt2f>> {
        let sides = rng.gen_range(4..14);
        let mut angles: Vec<f64> = (0..sides)
            .map(|_| rng.gen_range(0.0..2.0 * std::f64::consts::PI))
            .collect();
        angles.sort_by(|a, b| b.partial_cmp(a).unwrap());
        let points: Vec<Pnt2f> = angles
            .iter()
            .map(|&angle| {
                let radius: f64 = rng.gen_range(2.0..10.0);
                Pnt2f::new(
                    (radius * angle.cos()).round() as f32,
                    (radius * angle.sin()).round() as f32,
                )
            })
            .collect();

        let len = points.len();
        let mut sweep = 0.0f64;
        for i in 0..len {
            let (p, q) = (points[i], points[(i + 1) % len]);
            let cross = f64::from(p.x * q.y - p.y * q.x);
            if cross >= 0.0 {
                return None;
            }
            sweep += cross.atan2(f64::from(p.x * q.x + p.y * q.y));
        }
        if (sweep + 2.0 * std::f64::consts::PI).abs() < 1e-6 {
            Some(points)
        } else {
            None
        }
    }

    fn assert_covers(points: &[Pnt2f]) {
        let triangulation = triangulate(points, &TriangulateOptions::default())
            .unwrap_or_else(|error| panic!("{:?}: {}", points, error));
        let expected = shoelace_area(points);
        assert!(
            (triangulation.area() - expected).abs() < 1e-3,
            "{:?}: area {} != {}",
            points,
            triangulation.area(),
            expected
        );
        for triangle in &triangulation.triangles {
            let corners = triangulation.corners(triangle);
            for &point in points {
                assert!(!strictly_inside(point, corners), "{:?}", points);
            }
        }
    }

    #[test]
    fn test_diagonal_through_vertex() {
        // The diagonal from (-3, 2) to (-3, -6) passes through (-3, -1).
        let points = grid_points(&[
            (-8, 1),
            (-7, 4),
            (-3, 2),
            (-7, 8),
            (6, 3),
            (5, -4),
            (1, -2),
            (-3, -6),
            (-4, -2),
            (-3, -1),
        ]);
        assert_eq!(shoelace_area(&points), 97.0);
        assert_covers(&points);

        let triangle = grid_points(&[(0, 0), (0, 4), (4, 0)]);
        let corners = [triangle[0], triangle[1], triangle[2]];
        assert!(inside_or_on_edge(Pnt2f::new(0.0, 2.0), corners));
        assert!(inside_or_on_edge(Pnt2f::new(2.0, 2.0), corners));
        assert!(!strictly_inside(Pnt2f::new(2.0, 2.0), corners));
        assert!(!inside_or_on_edge(Pnt2f::new(3.0, 3.0), corners));
    }

    #[test]
    fn test_ear_clipping_grid_polygons() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut checked = 0;
        while checked < 1000 {
            if let Some(points) = grid_star(&mut rng) {
                assert_covers(&points);
                checked += 1;
            }
        }
    }

    #[test]
    fn test_uvs() {
        let points = l_shape();
        let options = TriangulateOptions {
            uv_scale: 32.0,
            ..TriangulateOptions::default()
        };
        let triangulation = triangulate(&points, &options).unwrap();
        assert_eq!(triangulation.uvs.len(), triangulation.points.len());
        for (point, uv) in triangulation.points.iter().zip(&triangulation.uvs) {
            assert_eq!(uv.x * 32.0, point.x);
            assert_eq!(uv.y * 32.0, point.y);
        }
    }

    #[test]
    fn test_colinear_handling() {
        let points: Vec<Pnt2f> = [(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (2.0, 2.0), (2.0, 0.0)]
            .iter()
            .map(|&(x, y)| Pnt2f::new(x, y))
            .collect();

        let triangulation = triangulate(&points, &TriangulateOptions::default()).unwrap();
        assert_eq!(triangulation.points.len(), 4);
        assert_eq!(triangulation.triangles.len(), 2);

        // Kept colinear vertex: the fan's sliver along x = 0 is dropped.
        let options = TriangulateOptions {
            remove_colinear: false,
            ..TriangulateOptions::default()
        };
        let triangulation = triangulate(&points, &options).unwrap();
        assert_eq!(triangulation.triangles.len(), 2);
        assert_eq!(triangulation.points.len(), 4);
        assert!(!triangulation.points.contains(&Pnt2f::new(0.0, 1.0)));
        assert!((triangulation.area() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_failures() {
        let options = TriangulateOptions::default();
        match *triangulate(&[], &options).unwrap_err().kind() {
            ErrorKind::NullInput => {}
            ref other => panic!("unexpected error {:?}", other),
        }

        let line = [
            Pnt2f::new(0.0, 0.0),
            Pnt2f::new(1.0, 1.0),
            Pnt2f::new(2.0, 2.0),
        ];
        match *triangulate(&line, &options).unwrap_err().kind() {
            ErrorKind::TooFewVertices(_) => {}
            ref other => panic!("unexpected error {:?}", other),
        }
        let two = [Pnt2f::new(0.0, 0.0), Pnt2f::new(1.0, 1.0)];
        match *triangulate(&two, &options).unwrap_err().kind() {
            ErrorKind::TooFewVertices(2) => {}
            ref other => panic!("unexpected error {:?}", other),
        }
    }
}
