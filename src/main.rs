use clap::{value_t, App, AppSettings, Arg};
use error_chain::quick_main;
use errors::Result;
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;
use wad::{Archive, BspTree, BuildOptions, Level, LevelMeshes, TextureCache, TextureDirectory};

mod errors {
    use error_chain::error_chain;

    error_chain! {
        foreign_links {
            Argument(clap::Error);
        }
        errors {}
        links {
            Wad(wad::Error, wad::ErrorKind);
        }
    }
}

pub enum RunMode {
    Check {
        wad_file: PathBuf,
        options: BuildOptions,
    },
    ListLevelNames {
        wad_file: PathBuf,
    },
    Build {
        wad_file: PathBuf,
        options: BuildOptions,
        level_index: usize,
    },
}

impl RunMode {
    pub fn from_args() -> Result<RunMode> {
        let matches = App::new("wadgeom")
            .version(env!("CARGO_PKG_VERSION"))
            .author("Cristi Cobzarenco <cristi.cobzarenco@gmail.com>")
            .about("Turns the levels of a Doom WAD into textured triangle meshes.")
            .settings(&[AppSettings::ColoredHelp])
            .arg(
                Arg::with_name("iwad")
                    .long("iwad")
                    .short("i")
                    .help("initial WAD file to use")
                    .value_name("FILE")
                    .default_value("doom1.wad"),
            )
            .arg(
                Arg::with_name("config")
                    .long("config")
                    .short("c")
                    .help("path to TOML build options")
                    .value_name("FILE")
                    .takes_value(true),
            )
            .arg(
                Arg::with_name("level")
                    .long("level")
                    .short("l")
                    .help("the index of the level to build")
                    .value_name("N")
                    .default_value("0"),
            )
            .arg(
                Arg::with_name("check")
                    .long("check")
                    .help("build every level in the WAD, report failures, then exit"),
            )
            .arg(
                Arg::with_name("list-levels")
                    .long("list-levels")
                    .help("list the names and indices of all the levels in the WAD, then exit"),
            )
            .get_matches();

        let wad_file: PathBuf = value_t!(matches, "iwad", String)?.into();
        let options = match matches.value_of("config") {
            Some(path) => BuildOptions::from_file(&path)?,
            None => BuildOptions::default(),
        };

        Ok(if matches.is_present("list-levels") {
            RunMode::ListLevelNames { wad_file }
        } else if matches.is_present("check") {
            RunMode::Check { wad_file, options }
        } else {
            RunMode::Build {
                wad_file,
                options,
                level_index: value_t!(matches, "level", usize)?,
            }
        })
    }
}

fn build_level(
    wad: &Archive,
    textures: &TextureDirectory,
    options: &BuildOptions,
    level_index: usize,
) -> Result<LevelMeshes> {
    let level = Level::from_archive(wad, level_index)?;
    let tree = BspTree::new(&level)?;
    if let Some(bounds) = level.bounds() {
        let center = bounds.min + (bounds.max - bounds.min) * 0.5;
        let sector = tree.sector_at(center)?;
        info!(
            "Level {} spans {:?}..{:?}; the centre lies in sector {}.",
            level.name(),
            bounds.min,
            bounds.max,
            sector
        );
    }
    Ok(LevelMeshes::build(&level, textures, options)?)
}

fn run() -> Result<()> {
    env_logger::init();

    match RunMode::from_args()? {
        RunMode::ListLevelNames { wad_file } => {
            let wad = Archive::open(&wad_file)?;
            for (i_level, name) in wad.level_names().enumerate() {
                println!("{:3} {:8}", i_level, name);
            }
        }
        RunMode::Check { wad_file, options } => {
            info!("Building all levels...");
            let start_time = Instant::now();
            let wad = Archive::open(&wad_file)?;
            let textures = TextureDirectory::from_archive(&wad)?;
            let mut num_failures = 0;
            let mut cache = TextureCache::new();
            for (name, error) in textures.check_textures(&wad, options.palette, &mut cache) {
                warn!("texture {}: {}", name, error);
                num_failures += 1;
            }
            for level_index in 0..wad.num_levels() {
                match build_level(&wad, &textures, &options, level_index) {
                    Ok(meshes) => {
                        for failure in &meshes.failures {
                            warn!("level {}: {}", level_index, failure.error);
                        }
                        num_failures += meshes.failures.len();
                    }
                    Err(e) => {
                        error!("reading level {}: {}", level_index, e);
                        num_failures += 1;
                    }
                }
            }
            info!(
                "Done building {} levels and {} textures in {:.4}s, {} failures.",
                wad.num_levels(),
                textures.texture_names().count(),
                start_time.elapsed().as_secs_f64(),
                num_failures
            );
        }
        RunMode::Build {
            wad_file,
            options,
            level_index,
        } => {
            let wad = Archive::open(&wad_file)?;
            let textures = TextureDirectory::from_archive(&wad)?;
            textures.palette(options.palette)?;
            let meshes = build_level(&wad, &textures, &options, level_index)?;
            for (name, group) in &meshes.groups {
                println!(
                    "{:8} {:6} vertices {:6} triangles",
                    name,
                    group.vertices.len(),
                    group.num_triangles()
                );
            }
            println!(
                "{} groups, {} triangles, {} failures",
                meshes.groups.len(),
                meshes.num_triangles(),
                meshes.failures.len()
            );
        }
    }
    Ok(())
}

quick_main!(run);
