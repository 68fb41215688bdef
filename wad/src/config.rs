use super::errors::{ErrorKind, Result, ResultExt};
use super::triangulate::TriangulateOptions;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WallToggles {
    pub lower: bool,
    pub middle: bool,
    pub upper: bool,
}

impl Default for WallToggles {
    fn default() -> Self {
        WallToggles {
            lower: true,
            middle: true,
            upper: true,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FlatToggles {
    pub floor: bool,
    pub ceiling: bool,
}

impl Default for FlatToggles {
    fn default() -> Self {
        FlatToggles {
            floor: true,
            ceiling: true,
        }
    }
}

/// Knobs for turning a level into meshes. Every field may be left out of the
/// TOML file.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Multiplies every emitted coordinate, horizontal and vertical.
    pub scale: f32,
    pub palette: usize,
    pub walls: WallToggles,
    pub flats: FlatToggles,
    pub triangulation: TriangulateOptions,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            scale: 1.0,
            palette: 0,
            walls: WallToggles::default(),
            flats: FlatToggles::default(),
            triangulation: TriangulateOptions::default(),
        }
    }
}

impl BuildOptions {
    pub fn from_file<P: AsRef<Path>>(path: &P) -> Result<BuildOptions> {
        let mut contents = String::new();
        File::open(path.as_ref())
            .and_then(|mut file| file.read_to_string(&mut contents))
            .chain_err(ErrorKind::on_config_read)?;
        BuildOptions::from_toml_str(&contents)
    }

    pub fn from_toml_str(text: &str) -> Result<BuildOptions> {
        toml::from_str(text).chain_err(ErrorKind::on_config_parse)
    }
}
