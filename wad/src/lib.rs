mod archive;
mod errors;
mod image;
mod level;
mod mesh;
mod name;
mod outline;
mod visitor;

pub mod bsp;
pub mod config;
pub mod tex;
pub mod triangulate;
pub mod types;
pub mod util;

pub use archive::{Archive, LumpReader};
pub use bsp::{BspTree, Side};
pub use config::BuildOptions;
pub use errors::{Error, ErrorKind, Result};
pub use image::{Image, RgbaImage};
pub use level::{Level, LevelLumps, SectorSegs};
pub use mesh::{LevelMeshes, MeshGroup};
pub use name::{IntoWadName, WadName};
pub use outline::{OutlineLoop, SectorOutline};
pub use tex::{TextureCache, TextureDirectory, TextureSizes};
pub use triangulate::{triangulate, Triangulation, TriangulateOptions};
pub use visitor::{BuildFailure, FlatPoly, LevelVisitor, LevelWalker, LinedefContext};
pub use visitor::{SideContext, VisitorChain, WallPart, WallQuad};
