//! Rebuilds closed floor outlines for a sector from its unordered segs.

use super::errors::{ErrorKind, Result};
use error_chain::bail;
use indexmap::IndexSet;
use log::debug;
use math::{Aabb2f, Pnt2f};

/// Failed scans tolerated while extending one loop before it is abandoned.
pub const MAX_CONSECUTIVE_MISSES: usize = 10;

/// Abandoned loops tolerated in a row before the whole sector is given up.
pub const MAX_CONSECUTIVE_ABANDONED: usize = 5;

/// A closed loop of map vertices. The start vertex is not repeated at the end.
#[derive(Clone, Debug)]
pub struct OutlineLoop {
    pub vertices: Vec<usize>,
    pub points: Vec<Pnt2f>,
    pub bounds: Aabb2f,
}

impl OutlineLoop {
    fn new(vertices: Vec<usize>, positions: &[Pnt2f]) -> Option<OutlineLoop> {
        let points: Vec<Pnt2f> = vertices.iter().map(|&id| positions[id]).collect();
        let bounds = Aabb2f::from_points(points.iter().cloned())?;
        Some(OutlineLoop {
            vertices,
            points,
            bounds,
        })
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn area(&self) -> f32 {
        self.bounds.area()
    }

    /// Even-odd point containment test against the loop's edges.
    pub fn contains_point(&self, point: Pnt2f) -> bool {
        self.bounds.contains_point(point) && point_in_polygon(&self.points, point)
    }
}

/// A sector's reconstructed outline: the loop with the largest bounding box,
/// plus every other closed loop found.
#[derive(Clone, Debug)]
pub struct SectorOutline {
    pub outer: OutlineLoop,
    pub holes: Vec<OutlineLoop>,
}

impl SectorOutline {
    /// Rebuilds the loops of `sector` from directed vertex pairs, front segs
    /// first. `positions` is the level's vertex table.
    pub fn reconstruct(
        sector: usize,
        edges: &[(usize, usize)],
        positions: &[Pnt2f],
    ) -> Result<SectorOutline> {
        let mut remaining = dedup_edges(edges);
        let mut loops = Vec::new();
        let mut abandoned_in_row = 0;
        let mut cursor = 0;

        while let Some(first) = take_edge(&mut remaining, cursor) {
            match trace_loop(first, &mut remaining, &mut cursor) {
                Some(vertices) if vertices.len() >= 3 => {
                    if let Some(outline_loop) = OutlineLoop::new(vertices, positions) {
                        loops.push(outline_loop);
                    }
                    abandoned_in_row = 0;
                }
                traced => {
                    abandoned_in_row += 1;
                    debug!(
                        "Sector {}: abandoned loop of {} vertices ({} in a row).",
                        sector,
                        traced.map_or(0, |vertices| vertices.len()),
                        abandoned_in_row
                    );
                    if abandoned_in_row > MAX_CONSECUTIVE_ABANDONED {
                        bail!(ErrorKind::ReconstructionIncomplete(
                            sector,
                            format!(
                                "gave up after {} abandoned loops, {} segs left",
                                abandoned_in_row,
                                remaining.len()
                            ),
                        ));
                    }
                }
            }
        }

        if loops.is_empty() {
            bail!(ErrorKind::ReconstructionIncomplete(
                sector,
                format!("no closed loop among {} segs", edges.len()),
            ));
        }

        // Strictly largest bounding box wins; ties keep the earlier loop.
        let mut outer_index = 0;
        for (index, outline_loop) in loops.iter().enumerate().skip(1) {
            if outline_loop.area() > loops[outer_index].area() {
                outer_index = index;
            }
        }
        let outer = loops.remove(outer_index);
        debug!(
            "Sector {}: outer loop of {} vertices, {} holes.",
            sector,
            outer.len(),
            loops.len()
        );
        Ok(SectorOutline {
            outer,
            holes: loops,
        })
    }

    pub fn loops(&self) -> impl Iterator<Item = &OutlineLoop> {
        Some(&self.outer).into_iter().chain(self.holes.iter())
    }

    pub fn num_loops(&self) -> usize {
        1 + self.holes.len()
    }

    /// Whether `hole` lies inside the outer loop rather than beside it.
    pub fn is_nested(&self, hole: &OutlineLoop) -> bool {
        self.outer.bounds.contains(&hole.bounds)
            && hole
                .points
                .iter()
                .any(|&point| self.outer.contains_point(point))
    }
}

/// Drops repeated walls: two edges over the same unordered vertex pair are
/// one wall, and the first one seen is kept. Zero-length edges are dropped.
pub fn dedup_edges(edges: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut seen = IndexSet::with_capacity(edges.len());
    edges
        .iter()
        .cloned()
        .filter(|&(start, end)| start != end && seen.insert((start.min(end), start.max(end))))
        .collect()
}

fn take_edge(remaining: &mut Vec<(usize, usize)>, cursor: usize) -> Option<(usize, usize)> {
    if remaining.is_empty() {
        None
    } else {
        Some(remaining.remove(cursor % remaining.len()))
    }
}

/// Walks from `first` until the loop closes. Returns `None` when the loop is
/// abandoned. A failed scan flips the walk to the other end of the chain.
fn trace_loop(
    first: (usize, usize),
    remaining: &mut Vec<(usize, usize)>,
    cursor: &mut usize,
) -> Option<Vec<usize>> {
    let mut chain = vec![first.0, first.1];
    let mut misses = 0;
    loop {
        let trailing = chain[chain.len() - 1];
        if chain.len() > 1 && trailing == chain[0] {
            chain.pop();
            return Some(chain);
        }

        match find_neighbour(remaining, trailing, *cursor) {
            Some((index, next)) => {
                remaining.remove(index);
                *cursor = index;
                chain.push(next);
                misses = 0;
            }
            None => {
                misses += 1;
                if misses >= MAX_CONSECUTIVE_MISSES {
                    return None;
                }
                chain.reverse();
            }
        }
    }
}

/// Scans `edges` starting at `cursor`, wrapping around, for one touching
/// `vertex`. Returns its index and the vertex at its other end.
fn find_neighbour(edges: &[(usize, usize)], vertex: usize, cursor: usize) -> Option<(usize, usize)> {
    let len = edges.len();
    (0..len)
        .map(|offset| (cursor + offset) % len)
        .find_map(|index| {
            let (start, end) = edges[index];
            if start == vertex {
                Some((index, end))
            } else if end == vertex {
                Some((index, start))
            } else {
                None
            }
        })
}

pub fn point_in_polygon(polygon: &[Pnt2f], point: Pnt2f) -> bool {
    let mut inside = false;
    let mut previous = match polygon.last() {
        Some(&last) => last,
        None => return false,
    };
    for &current in polygon {
        if (current.y > point.y) != (previous.y > point.y) {
            let crossing_x = current.x
                + (point.y - current.y) * (previous.x - current.x) / (previous.y - current.y);
            if point.x < crossing_x {
                inside = !inside;
            }
        }
        previous = current;
    }
    inside
}
