use super::errors::{ErrorKind, Result};
use super::level::Level;
use super::types::{Child, WadNode};
use error_chain::{bail, ensure};
use math::{Line2f, Pnt2f, Vec2f};

/// Which half-space of a partition line a point falls in. `Left` is served
/// by a node's first child, `Right` by its second.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn child_index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

pub fn partition_line(node: &WadNode) -> Line2f {
    Line2f::from_origin_and_displace(
        Pnt2f::new(f32::from(node.line_x), f32::from(node.line_y)),
        Vec2f::new(f32::from(node.step_x), f32::from(node.step_y)),
    )
}

/// Points on the partition line itself count as `Left`.
pub fn classify_side(point: Pnt2f, node: &WadNode) -> Side {
    if partition_line(node).side_cross(point) <= 0.0 {
        Side::Left
    } else {
        Side::Right
    }
}

/// Read-only view of a level's node tree. The root is the last node.
pub struct BspTree<'a> {
    level: &'a Level,
    root: Child,
    max_depth: usize,
}

impl<'a> BspTree<'a> {
    pub fn new(level: &'a Level) -> Result<BspTree<'a>> {
        let nodes = level.nodes();
        let root = if nodes.is_empty() {
            ensure!(
                level.subsectors().len() == 1,
                ErrorKind::MalformedWad(format!(
                    "No BSP nodes, but {} subsectors",
                    level.subsectors().len()
                ))
            );
            Child::Subsector(0)
        } else {
            Child::Node(nodes.len() - 1)
        };
        Ok(BspTree {
            level,
            root,
            max_depth: nodes.len(),
        })
    }

    /// Caps descent depth below the default of one level per node.
    pub fn with_max_depth(self, max_depth: usize) -> BspTree<'a> {
        BspTree { max_depth, ..self }
    }

    pub fn root(&self) -> Child {
        self.root
    }

    /// The single subsector containing `point`.
    pub fn locate(&self, point: Pnt2f) -> Result<usize> {
        let mut child = self.root;
        let mut depth = 0;
        loop {
            match child {
                Child::Subsector(id) => return Ok(id),
                Child::Node(id) => {
                    depth += 1;
                    ensure!(depth <= self.max_depth, ErrorKind::cyclic_bsp(self.max_depth));
                    let node = self.level.node(id)?;
                    child = node.children[classify_side(point, node).child_index()];
                }
            }
        }
    }

    /// The sector whose floor lies under `point`.
    pub fn sector_at(&self, point: Pnt2f) -> Result<usize> {
        self.level.subsector_sector(self.locate(point)?)
    }

    /// Every subsector, nearest to `point` first: at each node the child on
    /// the point's side is visited before the other one.
    pub fn front_to_back(&self, point: Pnt2f) -> Result<Vec<usize>> {
        self.descend(Some(point))
    }

    /// Every subsector, in on-disk child order.
    pub fn subsectors(&self) -> Result<Vec<usize>> {
        self.descend(None)
    }

    fn descend(&self, towards: Option<Pnt2f>) -> Result<Vec<usize>> {
        let mut order = Vec::with_capacity(self.level.subsectors().len());
        let mut stack = vec![(self.root, 0)];
        while let Some((child, depth)) = stack.pop() {
            let id = match child {
                Child::Subsector(id) => {
                    order.push(id);
                    continue;
                }
                Child::Node(id) => id,
            };
            if depth >= self.max_depth {
                bail!(ErrorKind::cyclic_bsp(self.max_depth));
            }

            let node = self.level.node(id)?;
            let near = towards.map_or(Side::Left, |point| classify_side(point, node));
            // Far child first, so the near one is popped next.
            stack.push((node.children[near.opposite().child_index()], depth + 1));
            stack.push((node.children[near.child_index()], depth + 1));
        }
        Ok(order)
    }
}
