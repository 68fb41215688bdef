use super::archive::Archive;
use super::config::BuildOptions;
use super::errors::Result;
use super::level::Level;
use super::tex::TextureSizes;
use super::types::WadName;
use super::visitor::{BuildFailure, FlatPoly, LevelVisitor, LevelWalker, WallQuad};
use indexmap::IndexMap;
use log::info;
use math::{Pnt2f, Pnt3f, Vec2f};

/// Triangles sharing one texture, in world space: x east, y up, z south.
#[derive(Clone, Debug, Default)]
pub struct MeshGroup {
    pub vertices: Vec<Pnt3f>,
    pub indices: Vec<u32>,
    pub uvs: Vec<Vec2f>,
}

impl MeshGroup {
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    fn push_vertex(&mut self, point: Pnt2f, height: f32, uv: Vec2f) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(Pnt3f::new(point.x, height, -point.y));
        self.uvs.push(uv);
        index
    }

    fn push_wall(&mut self, quad: &WallQuad) {
        let (v1, v2) = quad.vertices;
        let (low, high) = quad.height_range;
        let (start, end) = (quad.tex_start, quad.tex_end);
        let corners = [
            self.push_vertex(v1, low, start),
            self.push_vertex(v2, low, Vec2f::new(end.x, start.y)),
            self.push_vertex(v2, high, end),
            self.push_vertex(v1, high, Vec2f::new(start.x, end.y)),
        ];
        self.indices.extend_from_slice(&[
            corners[0], corners[1], corners[2], corners[0], corners[2], corners[3],
        ]);
    }

    fn push_flat(&mut self, poly: &FlatPoly, flip: bool) {
        let base = self.vertices.len() as u32;
        for (&point, &uv) in poly.vertices.iter().zip(poly.uvs) {
            self.push_vertex(point, poly.height, uv);
        }
        for &[a, b, c] in poly.triangles {
            if flip {
                self.indices.extend_from_slice(&[base + a, base + c, base + b]);
            } else {
                self.indices.extend_from_slice(&[base + a, base + b, base + c]);
            }
        }
    }
}

/// A level's geometry grouped by texture name, plus whatever could not be
/// built.
#[derive(Debug, Default)]
pub struct LevelMeshes {
    pub groups: IndexMap<WadName, MeshGroup>,
    pub failures: Vec<BuildFailure>,
}

impl LevelMeshes {
    pub fn build(
        level: &Level,
        textures: &dyn TextureSizes,
        options: &BuildOptions,
    ) -> Result<LevelMeshes> {
        let mut builder = MeshBuilder::default();
        let failures = {
            let mut walker = LevelWalker::new(level, textures, options, &mut builder);
            walker.walk()?;
            walker.into_failures()
        };
        let meshes = LevelMeshes {
            groups: builder.groups,
            failures,
        };
        info!(
            "Built {} triangles in {} groups for {}.",
            meshes.num_triangles(),
            meshes.groups.len(),
            level.name()
        );
        Ok(meshes)
    }

    /// Loads level `index` from `wad` and builds it.
    pub fn from_archive(
        wad: &Archive,
        index: usize,
        textures: &dyn TextureSizes,
        options: &BuildOptions,
    ) -> Result<LevelMeshes> {
        LevelMeshes::build(&Level::from_archive(wad, index)?, textures, options)
    }

    pub fn num_triangles(&self) -> usize {
        self.groups.values().map(MeshGroup::num_triangles).sum()
    }

    pub fn group(&self, name: WadName) -> Option<&MeshGroup> {
        self.groups.get(&name)
    }
}

#[derive(Default)]
struct MeshBuilder {
    groups: IndexMap<WadName, MeshGroup>,
}

impl LevelVisitor for MeshBuilder {
    fn visit_wall_quad(&mut self, quad: &WallQuad) {
        self.groups
            .entry(quad.tex_name)
            .or_insert_with(MeshGroup::default)
            .push_wall(quad);
    }

    fn visit_floor_poly(&mut self, poly: &FlatPoly) {
        self.groups
            .entry(poly.tex_name)
            .or_insert_with(MeshGroup::default)
            .push_flat(poly, false);
    }

    // Seen from below, so the ceiling's triangles face the other way.
    fn visit_ceil_poly(&mut self, poly: &FlatPoly) {
        self.groups
            .entry(poly.tex_name)
            .or_insert_with(MeshGroup::default)
            .push_flat(poly, true);
    }
}

#[cfg(test)]
mod test {
    use super::LevelMeshes;
    use crate::config::BuildOptions;
    use crate::level::test::room_with_platform;
    use crate::level::Level;
    use crate::types::WadName;
    use crate::visitor::test::FixedSizes;

    fn name(value: &str) -> WadName {
        WadName::from_bytes(value.as_bytes()).unwrap()
    }

    #[test]
    fn test_groups() {
        let level = Level::from_lumps(name("E1M1"), room_with_platform()).unwrap();
        let meshes = LevelMeshes::build(&level, &FixedSizes, &BuildOptions::default()).unwrap();
        assert!(meshes.failures.is_empty());

        let names: Vec<_> = meshes.groups.keys().map(|name| name.as_str()).collect();
        assert_eq!(names, ["STARTAN3", "STEP1", "FLOOR4_8", "CEIL3_5", "FLAT14"]);

        let walls = meshes.group(name("STARTAN3")).unwrap();
        assert_eq!(walls.vertices.len(), 16);
        assert_eq!(walls.uvs.len(), 16);
        assert_eq!(walls.num_triangles(), 8);
        assert!(walls.indices.iter().all(|&index| (index as usize) < 16));

        // Two ceilings, two triangles each.
        assert_eq!(meshes.group(name("CEIL3_5")).unwrap().num_triangles(), 4);
        assert_eq!(meshes.num_triangles(), 8 + 8 + 2 + 4 + 2);
    }

    #[test]
    fn test_world_mapping() {
        let level = Level::from_lumps(name("E1M1"), room_with_platform()).unwrap();
        let mut options = BuildOptions::default();
        options.scale = 0.5;
        let meshes = LevelMeshes::build(&level, &FixedSizes, &options).unwrap();

        let platform = meshes.group(name("FLAT14")).unwrap();
        for vertex in &platform.vertices {
            assert_eq!(vertex.y, 12.0);
            assert!(vertex.x >= 48.0 && vertex.x <= 80.0);
            assert!(vertex.z <= -48.0 && vertex.z >= -80.0);
        }

        // Floor and ceiling of the same polygon wind in opposite directions.
        let floor = meshes.group(name("FLAT14")).unwrap();
        let ceiling = meshes.group(name("CEIL3_5")).unwrap();
        let ceiling_platform = &ceiling.indices[6..9];
        let floor_first = &floor.indices[0..3];
        assert_eq!(ceiling_platform[0] - 4, floor_first[0]);
        assert_eq!(ceiling_platform[1] - 4, floor_first[2]);
        assert_eq!(ceiling_platform[2] - 4, floor_first[1]);
    }
}
