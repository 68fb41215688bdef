use super::config::BuildOptions;
use super::errors::{Error, ErrorKind, Result};
use super::level::Level;
use super::tex::TextureSizes;
use super::triangulate::{self, Triangulation};
use super::types::{WadLinedef, WadName, WadSector, WadSidedef};
use super::util::is_untextured;
use indexmap::IndexSet;
use log::{debug, info, warn};
use math::prelude::*;
use math::{Pnt2f, Vec2f};
use std::cmp;
use std::iter;
use std::time::Instant;

/// Size assumed for textures the directory does not know about.
pub const PLACEHOLDER_SIZE: (usize, usize) = (64, 64);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum WallPart {
    Lower,
    Middle,
    Upper,
}

/// A vertical wall quad. `tex_start` is the texture coordinate at
/// `(vertices.0, height_range.0)` and `tex_end` the one at
/// `(vertices.1, height_range.1)`, both in texture repeats.
#[derive(Clone, Debug)]
pub struct WallQuad {
    pub linedef: usize,
    pub sector: usize,
    pub part: WallPart,
    pub tex_name: WadName,
    pub vertices: (Pnt2f, Pnt2f),
    pub height_range: (f32, f32),
    pub tex_start: Vec2f,
    pub tex_end: Vec2f,
}

/// A horizontal triangulated polygon at a fixed height.
pub struct FlatPoly<'a> {
    pub sector: usize,
    pub tex_name: WadName,
    pub height: f32,
    pub vertices: &'a [Pnt2f],
    pub uvs: &'a [Vec2f],
    pub triangles: &'a [[u32; 3]],
}

pub trait LevelVisitor: Sized {
    fn visit_wall_quad(&mut self, _quad: &WallQuad) {
        // Default impl is empty to allow visitors to mix and match.
    }

    fn visit_floor_poly(&mut self, _poly: &FlatPoly) {
        // Default impl is empty to allow visitors to mix and match.
    }

    fn visit_ceil_poly(&mut self, _poly: &FlatPoly) {
        // Default impl is empty to allow visitors to mix and match.
    }

    fn chain<'a, 'b, V: LevelVisitor>(
        &'a mut self,
        other: &'b mut V,
    ) -> VisitorChain<'a, 'b, Self, V> {
        VisitorChain {
            first: self,
            second: other,
        }
    }
}

pub struct VisitorChain<'a, 'b, A: 'a, B: 'b> {
    first: &'a mut A,
    second: &'b mut B,
}

impl<'a, 'b, A: LevelVisitor, B: LevelVisitor> LevelVisitor for VisitorChain<'a, 'b, A, B> {
    fn visit_wall_quad(&mut self, quad: &WallQuad) {
        self.first.visit_wall_quad(quad);
        self.second.visit_wall_quad(quad);
    }

    fn visit_floor_poly(&mut self, poly: &FlatPoly) {
        self.first.visit_floor_poly(poly);
        self.second.visit_floor_poly(poly);
    }

    fn visit_ceil_poly(&mut self, poly: &FlatPoly) {
        self.first.visit_ceil_poly(poly);
        self.second.visit_ceil_poly(poly);
    }
}

/// Something that went wrong for one sector or polygon without stopping the
/// rest of the level.
#[derive(Debug)]
pub struct BuildFailure {
    pub sector: Option<usize>,
    pub error: Error,
}

/// One side of a linedef together with the sector it faces.
#[derive(Copy, Clone)]
pub struct SideContext<'a> {
    pub sidedef: &'a WadSidedef,
    pub sector_id: usize,
    pub sector: &'a WadSector,
}

impl<'a> SideContext<'a> {
    fn new(level: &'a Level, sidedef: &'a WadSidedef) -> Result<SideContext<'a>> {
        let sector_id = usize::from(sidedef.sector);
        Ok(SideContext {
            sidedef,
            sector_id,
            sector: level.sector(sector_id)?,
        })
    }
}

/// Everything wall generation needs to know about a linedef.
pub struct LinedefContext<'a> {
    pub id: usize,
    pub linedef: &'a WadLinedef,
    pub vertices: (Pnt2f, Pnt2f),
    pub front: SideContext<'a>,
    pub back: Option<SideContext<'a>>,
}

impl<'a> LinedefContext<'a> {
    /// `None` for linedefs without a front side, which have nothing to draw.
    pub fn new(level: &'a Level, id: usize) -> Result<Option<LinedefContext<'a>>> {
        let linedef = level.linedef(id)?;
        let front = match level.linedef_front_sidedef(id)? {
            Some(sidedef) => SideContext::new(level, sidedef)?,
            None => return Ok(None),
        };
        let back = level
            .linedef_back_sidedef(id)?
            .map(|sidedef| SideContext::new(level, sidedef))
            .transpose()?;
        Ok(Some(LinedefContext {
            id,
            linedef,
            vertices: level.linedef_vertices(id)?,
            front,
            back,
        }))
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Peg {
    /// Texture top at the top of the wall.
    Top,
    /// Texture bottom at the bottom of the wall.
    Bottom,
    /// Texture top at the given ceiling height, for unpegged lower walls.
    Ceiling(i16),
    /// Like `Top`, but the wall is cut to one texture height.
    TopClamped,
    BottomClamped,
}

struct PendingWall<'c, 'a> {
    context: &'c LinedefContext<'a>,
    facing: &'c SideContext<'a>,
    part: WallPart,
    vertices: (Pnt2f, Pnt2f),
    height_range: (i16, i16),
    texture: WadName,
    peg: Peg,
}

pub struct LevelWalker<'a, V: LevelVisitor> {
    level: &'a Level,
    textures: &'a dyn TextureSizes,
    options: &'a BuildOptions,
    visitor: &'a mut V,
    failures: Vec<BuildFailure>,
    missing_textures: IndexSet<WadName>,
}

impl<'a, V: LevelVisitor> LevelWalker<'a, V> {
    pub fn new(
        level: &'a Level,
        textures: &'a dyn TextureSizes,
        options: &'a BuildOptions,
        visitor: &'a mut V,
    ) -> Self {
        LevelWalker {
            level,
            textures,
            options,
            visitor,
            failures: Vec::new(),
            missing_textures: IndexSet::new(),
        }
    }

    /// Visits every wall, then every floor and ceiling. Broken table
    /// references abort the walk; anything local to a sector or texture is
    /// recorded in `failures` instead.
    pub fn walk(&mut self) -> Result<()> {
        let start_time = Instant::now();
        for id in 0..self.level.linedefs().len() {
            match LinedefContext::new(self.level, id)? {
                Some(context) => self.linedef(&context),
                None => debug!("Linedef {} has no front side, skipping.", id),
            }
        }
        if self.options.flats.floor || self.options.flats.ceiling {
            for id in 0..self.level.sectors().len() {
                self.sector_flats(id)?;
            }
        }
        info!(
            "Walked level {} in {:.2}ms, {} failures.",
            self.level.name(),
            start_time.elapsed().as_secs_f64() * 1000.0,
            self.failures.len()
        );
        Ok(())
    }

    pub fn failures(&self) -> &[BuildFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<BuildFailure> {
        self.failures
    }

    fn linedef(&mut self, context: &LinedefContext) {
        self.side_walls(context, &context.front, context.back.as_ref(), context.vertices);
        if let Some(ref back) = context.back {
            let (v1, v2) = context.vertices;
            self.side_walls(context, back, Some(&context.front), (v2, v1));
        }
    }

    fn side_walls(
        &mut self,
        context: &LinedefContext,
        facing: &SideContext,
        opposite: Option<&SideContext>,
        vertices: (Pnt2f, Pnt2f),
    ) {
        let walls = self.options.walls;
        let sidedef = facing.sidedef;
        let (floor, ceiling) = (facing.sector.floor_height, facing.sector.ceiling_height);
        let lower_unpegged = context.linedef.lower_unpegged();

        let opposite = match opposite {
            Some(opposite) => opposite.sector,
            None => {
                if walls.middle {
                    self.wall(PendingWall {
                        context,
                        facing,
                        part: WallPart::Middle,
                        vertices,
                        height_range: (floor, ceiling),
                        texture: sidedef.middle_texture,
                        peg: if lower_unpegged { Peg::Bottom } else { Peg::Top },
                    });
                }
                return;
            }
        };

        let (other_floor, other_ceiling) = (opposite.floor_height, opposite.ceiling_height);
        if walls.lower && other_floor > floor {
            self.wall(PendingWall {
                context,
                facing,
                part: WallPart::Lower,
                vertices,
                height_range: (floor, other_floor),
                texture: sidedef.lower_texture,
                peg: if lower_unpegged {
                    Peg::Ceiling(ceiling)
                } else {
                    Peg::Top
                },
            });
        }
        if walls.upper && other_ceiling < ceiling {
            self.wall(PendingWall {
                context,
                facing,
                part: WallPart::Upper,
                vertices,
                height_range: (other_ceiling, ceiling),
                texture: sidedef.upper_texture,
                peg: if context.linedef.upper_unpegged() {
                    Peg::Top
                } else {
                    Peg::Bottom
                },
            });
        }
        if walls.middle {
            self.wall(PendingWall {
                context,
                facing,
                part: WallPart::Middle,
                vertices,
                height_range: (cmp::max(floor, other_floor), cmp::min(ceiling, other_ceiling)),
                texture: sidedef.middle_texture,
                peg: if lower_unpegged {
                    Peg::BottomClamped
                } else {
                    Peg::TopClamped
                },
            });
        }
    }

    fn wall(&mut self, wall: PendingWall) {
        let PendingWall {
            context,
            facing,
            part,
            vertices: (v1, v2),
            height_range: (low, high),
            texture,
            peg,
        } = wall;
        if low >= high || is_untextured(texture) {
            return;
        }
        let (width, height) = self.texture_size(facing.sector_id, texture);
        let (width, height) = (width as f32, height as f32);

        let (mut low, mut high) = (f32::from(low), f32::from(high));
        match peg {
            Peg::TopClamped => low = low.max(high - height),
            Peg::BottomClamped => high = high.min(low + height),
            _ => {}
        }
        let span = high - low;
        let (t_low, t_high) = match peg {
            Peg::Top | Peg::TopClamped => (span, 0.0),
            Peg::Bottom | Peg::BottomClamped => (height, height - span),
            Peg::Ceiling(ceiling) => {
                let start = f32::from(ceiling) - high;
                (start + span, start)
            }
        };
        let y_offset = f32::from(facing.sidedef.y_offset);
        let s1 = f32::from(facing.sidedef.x_offset);
        let s2 = s1 + (v2 - v1).magnitude();

        let scale = self.options.scale;
        self.visitor.visit_wall_quad(&WallQuad {
            linedef: context.id,
            sector: facing.sector_id,
            part,
            tex_name: texture,
            vertices: (v1 * scale, v2 * scale),
            height_range: (low * scale, high * scale),
            tex_start: Vec2f::new(s1 / width, (t_low + y_offset) / height),
            tex_end: Vec2f::new(s2 / width, (t_high + y_offset) / height),
        });
    }

    fn sector_flats(&mut self, id: usize) -> Result<()> {
        let sector = self.level.sector(id)?;
        let outline = match self.level.sector_outline(id) {
            Ok(outline) => outline,
            Err(error) => {
                self.fail(Some(id), error);
                return Ok(());
            }
        };
        let loops = iter::once(&outline.outer).chain(
            outline
                .holes
                .iter()
                .filter(|hole| !outline.is_nested(hole)),
        );
        for outline_loop in loops {
            match triangulate::triangulate(&outline_loop.points, &self.options.triangulation) {
                Ok(triangulation) => self.flat_polys(id, sector, &triangulation),
                Err(error) => self.fail(Some(id), error),
            }
        }
        Ok(())
    }

    fn flat_polys(&mut self, id: usize, sector: &WadSector, triangulation: &Triangulation) {
        let scale = self.options.scale;
        let vertices: Vec<Pnt2f> = triangulation
            .points
            .iter()
            .map(|&point| point * scale)
            .collect();

        if self.options.flats.floor {
            self.check_flat(id, sector.floor_texture);
            self.visitor.visit_floor_poly(&FlatPoly {
                sector: id,
                tex_name: sector.floor_texture,
                height: f32::from(sector.floor_height) * scale,
                vertices: &vertices,
                uvs: &triangulation.uvs,
                triangles: &triangulation.triangles,
            });
        }
        if self.options.flats.ceiling {
            self.check_flat(id, sector.ceiling_texture);
            self.visitor.visit_ceil_poly(&FlatPoly {
                sector: id,
                tex_name: sector.ceiling_texture,
                height: f32::from(sector.ceiling_height) * scale,
                vertices: &vertices,
                uvs: &triangulation.uvs,
                triangles: &triangulation.triangles,
            });
        }
    }

    fn texture_size(&mut self, sector: usize, name: WadName) -> (usize, usize) {
        match self.textures.texture_size(name) {
            Some(size) => size,
            None => {
                self.missing_texture(sector, name);
                PLACEHOLDER_SIZE
            }
        }
    }

    fn check_flat(&mut self, sector: usize, name: WadName) {
        if self.textures.flat_size(name).is_none() {
            self.missing_texture(sector, name);
        }
    }

    fn missing_texture(&mut self, sector: usize, name: WadName) {
        if self.missing_textures.insert(name) {
            self.fail(Some(sector), ErrorKind::MissingTexture(name.to_string()).into());
        }
    }

    fn fail(&mut self, sector: Option<usize>, error: Error) {
        match sector {
            Some(sector) => warn!("Sector {}: {}", sector, error),
            None => warn!("{}", error),
        }
        self.failures.push(BuildFailure { sector, error });
    }
}
