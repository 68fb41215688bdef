use super::archive::Archive;
use super::errors::{ErrorKind, Result};
use super::outline::SectorOutline;
use super::types::{Child, WadName, WadNode, WadSector};
use super::types::{WadLinedef, WadSeg, WadSidedef, WadSubsector, WadVertex};
use error_chain::{bail, ensure};
use log::{debug, info, warn};
use math::{Aabb2f, Pnt2f};
use std::mem;
use std::result::Result as StdResult;
use std::vec::Vec;

const LEVEL_LUMPS: [&str; 8] = [
    "THINGS", "LINEDEFS", "SIDEDEFS", "VERTEXES", "SEGS", "SSECTORS", "NODES", "SECTORS",
];
const LINEDEFS_OFFSET: usize = 2;
const SIDEDEFS_OFFSET: usize = 3;
const VERTICES_OFFSET: usize = 4;
const SEGS_OFFSET: usize = 5;
const SSECTORS_OFFSET: usize = 6;
const NODES_OFFSET: usize = 7;
const SECTORS_OFFSET: usize = 8;

/// Raw decoded map tables, before cross references are checked.
#[derive(Clone, Default)]
pub struct LevelLumps {
    pub linedefs: Vec<WadLinedef>,
    pub sidedefs: Vec<WadSidedef>,
    pub vertices: Vec<WadVertex>,
    pub segs: Vec<WadSeg>,
    pub subsectors: Vec<WadSubsector>,
    pub nodes: Vec<WadNode>,
    pub sectors: Vec<WadSector>,
}

/// The segs bordering a sector: those running along one of its sidedefs, and
/// those whose far side faces into it.
#[derive(Clone, Debug, Default)]
pub struct SectorSegs {
    pub front: Vec<usize>,
    pub back: Vec<usize>,
}

pub struct Level {
    name: WadName,
    vertices: Vec<Pnt2f>,
    linedefs: Vec<WadLinedef>,
    sidedefs: Vec<WadSidedef>,
    segs: Vec<WadSeg>,
    subsectors: Vec<WadSubsector>,
    nodes: Vec<WadNode>,
    sectors: Vec<WadSector>,
    bounds: Option<Aabb2f>,
    sector_segs: Vec<SectorSegs>,
    outlines: Vec<StdResult<SectorOutline, String>>,
}

impl Level {
    pub fn from_archive(wad: &Archive, index: usize) -> Result<Level> {
        let lump = wad.level_lump(index)?;
        let name = lump.name();
        info!("Reading level data for '{}'...", name);
        let start_index = lump.index();
        for (offset, &expected) in LEVEL_LUMPS.iter().enumerate() {
            let found = wad.lump_by_index(start_index + offset + 1)?.name();
            ensure!(
                found.as_str() == expected,
                ErrorKind::bad_level_lump(name.as_str(), expected, found.as_str())
            );
        }

        let lumps = LevelLumps {
            linedefs: wad
                .lump_by_index(start_index + LINEDEFS_OFFSET)?
                .decode_vec()?,
            sidedefs: wad
                .lump_by_index(start_index + SIDEDEFS_OFFSET)?
                .decode_vec()?,
            vertices: wad
                .lump_by_index(start_index + VERTICES_OFFSET)?
                .decode_vec()?,
            segs: wad.lump_by_index(start_index + SEGS_OFFSET)?.decode_vec()?,
            subsectors: wad
                .lump_by_index(start_index + SSECTORS_OFFSET)?
                .decode_vec()?,
            nodes: wad
                .lump_by_index(start_index + NODES_OFFSET)?
                .decode_vec()?,
            sectors: wad
                .lump_by_index(start_index + SECTORS_OFFSET)?
                .decode_vec()?,
        };
        let level = Level::from_lumps(name, lumps)?;

        info!("Loaded level '{}':", name);
        info!("    {:4} linedefs", level.linedefs.len());
        info!("    {:4} sidedefs", level.sidedefs.len());
        info!("    {:4} vertices", level.vertices.len());
        info!("    {:4} segs", level.segs.len());
        info!("    {:4} subsectors", level.subsectors.len());
        info!("    {:4} nodes", level.nodes.len());
        info!("    {:4} sectors", level.sectors.len());
        Ok(level)
    }

    /// Builds a level from decoded tables, rejecting any dangling reference,
    /// then reconstructs every sector's outline.
    pub fn from_lumps(name: WadName, lumps: LevelLumps) -> Result<Level> {
        let LevelLumps {
            linedefs,
            sidedefs,
            vertices: wad_vertices,
            segs,
            subsectors,
            nodes,
            sectors,
        } = lumps;

        let mut bounds: Option<Aabb2f> = None;
        let mut vertices = Vec::with_capacity(wad_vertices.len());
        for vertex in &wad_vertices {
            let point = Pnt2f::new(f32::from(vertex.x), f32::from(vertex.y));
            match bounds {
                Some(ref mut bounds) => bounds.extend(point),
                None => bounds = Some(Aabb2f::from_point(point)),
            }
            vertices.push(point);
        }

        let mut level = Level {
            name,
            vertices,
            linedefs,
            sidedefs,
            segs,
            subsectors,
            nodes,
            sectors,
            bounds,
            sector_segs: Vec::new(),
            outlines: Vec::new(),
        };
        level.validate()?;
        level.build_outlines()?;
        Ok(level)
    }

    fn validate(&self) -> Result<()> {
        let check = |table: &str, index: usize, target: &str, id: usize, len: usize| {
            if id < len {
                Ok(())
            } else {
                Err(ErrorKind::bad_reference(table, index, target, id, len))
            }
        };

        for (index, linedef) in self.linedefs.iter().enumerate() {
            let num_vertices = self.vertices.len();
            check("Linedef", index, "vertex", linedef.start_vertex.into(), num_vertices)?;
            check("Linedef", index, "vertex", linedef.end_vertex.into(), num_vertices)?;
            for side in linedef.front_side().into_iter().chain(linedef.back_side()) {
                check("Linedef", index, "sidedef", side, self.sidedefs.len())?;
            }
        }
        for (index, sidedef) in self.sidedefs.iter().enumerate() {
            check("Sidedef", index, "sector", sidedef.sector.into(), self.sectors.len())?;
        }
        for (index, seg) in self.segs.iter().enumerate() {
            let num_vertices = self.vertices.len();
            check("Seg", index, "vertex", seg.start_vertex.into(), num_vertices)?;
            check("Seg", index, "vertex", seg.end_vertex.into(), num_vertices)?;
            check("Seg", index, "linedef", seg.linedef.into(), self.linedefs.len())?;
            let linedef = &self.linedefs[usize::from(seg.linedef)];
            let side = if seg.is_front() {
                linedef.front_side()
            } else {
                linedef.back_side()
            };
            if side.is_none() {
                bail!(ErrorKind::MalformedWad(format!(
                    "Seg {} runs along a missing side of linedef {}",
                    index, seg.linedef
                )));
            }
        }
        for (index, subsector) in self.subsectors.iter().enumerate() {
            let end = usize::from(subsector.first_seg) + usize::from(subsector.num_segs);
            ensure!(
                subsector.num_segs > 0,
                ErrorKind::MalformedWad(format!("Subsector {} has no segs", index))
            );
            check("Subsector", index, "seg", end - 1, self.segs.len())?;
        }
        // Every node and subsector hangs off at most one parent.
        let mut node_has_parent = vec![false; self.nodes.len()];
        let mut subsector_has_parent = vec![false; self.subsectors.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                let (target, id, has_parent) = match child {
                    Child::Node(id) => {
                        check("Node", index, "node", id, self.nodes.len())?;
                        ("node", id, &mut node_has_parent[id])
                    }
                    Child::Subsector(id) => {
                        check("Node", index, "subsector", id, self.subsectors.len())?;
                        ("subsector", id, &mut subsector_has_parent[id])
                    }
                };
                ensure!(
                    !mem::replace(has_parent, true),
                    ErrorKind::shared_bsp_child(index, target, id)
                );
            }
        }
        Ok(())
    }

    fn build_outlines(&mut self) -> Result<()> {
        let mut sector_segs = vec![SectorSegs::default(); self.sectors.len()];
        for seg_id in 0..self.segs.len() {
            sector_segs[self.seg_sector(seg_id)?].front.push(seg_id);
            if let Some(back) = self.seg_back_sector(seg_id)? {
                sector_segs[back].back.push(seg_id);
            }
        }

        let mut outlines = Vec::with_capacity(sector_segs.len());
        for (sector_id, segs) in sector_segs.iter().enumerate() {
            let edges: Vec<(usize, usize)> = segs
                .front
                .iter()
                .chain(&segs.back)
                .map(|&seg_id| {
                    let seg = &self.segs[seg_id];
                    (usize::from(seg.start_vertex), usize::from(seg.end_vertex))
                })
                .collect();
            let outline = SectorOutline::reconstruct(sector_id, &edges, &self.vertices)
                .map_err(|error| match *error.kind() {
                    ErrorKind::ReconstructionIncomplete(_, ref reason) => reason.clone(),
                    _ => error.to_string(),
                });
            if let Err(ref reason) = outline {
                warn!("Sector {} has no usable outline: {}", sector_id, reason);
            }
            outlines.push(outline);
        }
        debug!(
            "Reconstructed {} of {} sector outlines.",
            outlines.iter().filter(|outline| outline.is_ok()).count(),
            outlines.len()
        );

        self.sector_segs = sector_segs;
        self.outlines = outlines;
        Ok(())
    }

    pub fn name(&self) -> WadName {
        self.name
    }

    /// Extents of every vertex; `None` for a level without vertices.
    pub fn bounds(&self) -> Option<Aabb2f> {
        self.bounds
    }

    pub fn vertices(&self) -> &[Pnt2f] {
        &self.vertices
    }

    pub fn linedefs(&self) -> &[WadLinedef] {
        &self.linedefs
    }

    pub fn sidedefs(&self) -> &[WadSidedef] {
        &self.sidedefs
    }

    pub fn segs(&self) -> &[WadSeg] {
        &self.segs
    }

    pub fn subsectors(&self) -> &[WadSubsector] {
        &self.subsectors
    }

    pub fn nodes(&self) -> &[WadNode] {
        &self.nodes
    }

    pub fn sectors(&self) -> &[WadSector] {
        &self.sectors
    }

    pub fn vertex(&self, id: usize) -> Result<Pnt2f> {
        lookup(&self.vertices, "vertices", id).map(|&point| point)
    }

    pub fn linedef(&self, id: usize) -> Result<&WadLinedef> {
        lookup(&self.linedefs, "linedefs", id)
    }

    pub fn sidedef(&self, id: usize) -> Result<&WadSidedef> {
        lookup(&self.sidedefs, "sidedefs", id)
    }

    pub fn sector(&self, id: usize) -> Result<&WadSector> {
        lookup(&self.sectors, "sectors", id)
    }

    pub fn seg(&self, id: usize) -> Result<&WadSeg> {
        lookup(&self.segs, "segs", id)
    }

    pub fn subsector(&self, id: usize) -> Result<&WadSubsector> {
        lookup(&self.subsectors, "subsectors", id)
    }

    pub fn node(&self, id: usize) -> Result<&WadNode> {
        lookup(&self.nodes, "nodes", id)
    }

    pub fn linedef_vertices(&self, id: usize) -> Result<(Pnt2f, Pnt2f)> {
        let linedef = self.linedef(id)?;
        Ok((
            self.vertex(linedef.start_vertex.into())?,
            self.vertex(linedef.end_vertex.into())?,
        ))
    }

    pub fn linedef_front_sidedef(&self, id: usize) -> Result<Option<&WadSidedef>> {
        self.linedef(id)?
            .front_side()
            .map(|side| self.sidedef(side))
            .transpose()
    }

    pub fn linedef_back_sidedef(&self, id: usize) -> Result<Option<&WadSidedef>> {
        self.linedef(id)?
            .back_side()
            .map(|side| self.sidedef(side))
            .transpose()
    }

    /// Id of the sector on the linedef's front side.
    pub fn linedef_front_sector(&self, id: usize) -> Result<Option<usize>> {
        Ok(self
            .linedef_front_sidedef(id)?
            .map(|side| usize::from(side.sector)))
    }

    pub fn linedef_back_sector(&self, id: usize) -> Result<Option<usize>> {
        Ok(self
            .linedef_back_sidedef(id)?
            .map(|side| usize::from(side.sector)))
    }

    pub fn seg_linedef(&self, id: usize) -> Result<&WadLinedef> {
        self.linedef(self.seg(id)?.linedef.into())
    }

    pub fn seg_vertices(&self, id: usize) -> Result<(Pnt2f, Pnt2f)> {
        let seg = self.seg(id)?;
        Ok((
            self.vertex(seg.start_vertex.into())?,
            self.vertex(seg.end_vertex.into())?,
        ))
    }

    /// The sidedef the seg runs along.
    pub fn seg_sidedef(&self, id: usize) -> Result<&WadSidedef> {
        let seg = self.seg(id)?;
        let linedef = usize::from(seg.linedef);
        let side = if seg.is_front() {
            self.linedef_front_sidedef(linedef)?
        } else {
            self.linedef_back_sidedef(linedef)?
        };
        side.ok_or_else(|| ErrorKind::IndexOutOfRange("sidedefs", linedef, self.sidedefs.len()).into())
    }

    pub fn seg_back_sidedef(&self, id: usize) -> Result<Option<&WadSidedef>> {
        let seg = self.seg(id)?;
        let linedef = usize::from(seg.linedef);
        if seg.is_front() {
            self.linedef_back_sidedef(linedef)
        } else {
            self.linedef_front_sidedef(linedef)
        }
    }

    pub fn seg_sector(&self, id: usize) -> Result<usize> {
        Ok(usize::from(self.seg_sidedef(id)?.sector))
    }

    pub fn seg_back_sector(&self, id: usize) -> Result<Option<usize>> {
        Ok(self
            .seg_back_sidedef(id)?
            .map(|side| usize::from(side.sector)))
    }

    pub fn ssector_segs(&self, id: usize) -> Result<&[WadSeg]> {
        let subsector = self.subsector(id)?;
        let start = usize::from(subsector.first_seg);
        let end = start + usize::from(subsector.num_segs);
        self.segs
            .get(start..end)
            .ok_or_else(|| ErrorKind::IndexOutOfRange("segs", end, self.segs.len()).into())
    }

    /// The sector a subsector belongs to, taken from its first seg.
    pub fn subsector_sector(&self, id: usize) -> Result<usize> {
        let first_seg = usize::from(self.subsector(id)?.first_seg);
        self.seg_sector(first_seg)
    }

    pub fn sector_segs(&self, id: usize) -> Result<&SectorSegs> {
        lookup(&self.sector_segs, "sectors", id)
    }

    pub fn sector_outline(&self, id: usize) -> Result<&SectorOutline> {
        match *lookup(&self.outlines, "sectors", id)? {
            Ok(ref outline) => Ok(outline),
            Err(ref reason) => bail!(ErrorKind::ReconstructionIncomplete(id, reason.clone())),
        }
    }

    /// Sectors whose outline could not be rebuilt, with the reason.
    pub fn outline_failures(&self) -> impl Iterator<Item = (usize, &str)> {
        self.outlines
            .iter()
            .enumerate()
            .filter_map(|(id, outline)| match *outline {
                Ok(_) => None,
                Err(ref reason) => Some((id, reason.as_str())),
            })
    }
}

fn lookup<'a, T>(table: &'a [T], name: &'static str, index: usize) -> Result<&'a T> {
    table
        .get(index)
        .ok_or_else(|| ErrorKind::IndexOutOfRange(name, index, table.len()).into())
}
