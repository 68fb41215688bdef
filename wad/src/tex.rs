use super::archive::Archive;
use super::errors::{Error, ErrorKind, Result, ResultExt};
use super::image::{Image, RgbaImage};
use super::name::WadName;
use super::types::{Palette, WadRecord, WadTextureHeader, WadTexturePatchRef};
use byteorder::{LittleEndian, ReadBytesExt};
use error_chain::{bail, ensure};
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use std::time::Instant;

/// One patch drawn into a composite texture, top-left corner at the origin.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PatchPlacement {
    pub origin_x: i16,
    pub origin_y: i16,
    pub patch: usize,
}

#[derive(Clone, Debug)]
pub struct CompositeTexture {
    pub name: WadName,
    pub width: usize,
    pub height: usize,
    pub placements: Vec<PatchPlacement>,
}

/// Width and height of wall textures and flats by name, used for UV mapping.
pub trait TextureSizes {
    fn texture_size(&self, name: WadName) -> Option<(usize, usize)>;

    fn flat_size(&self, _name: WadName) -> Option<(usize, usize)> {
        Some((64, 64))
    }
}

/// Rendered images, keyed by name and palette index, plus patches found by
/// lump name outside PNAMES. Owned by the caller and tied to one archive.
#[derive(Default)]
pub struct TextureCache {
    textures: IndexMap<(WadName, usize), RgbaImage>,
    flats: IndexMap<(WadName, usize), RgbaImage>,
    loose_patches: IndexMap<WadName, Image>,
}

impl TextureCache {
    pub fn new() -> TextureCache {
        TextureCache::default()
    }

    pub fn len(&self) -> usize {
        self.textures.len() + self.flats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.textures.clear();
        self.flats.clear();
        self.loose_patches.clear();
    }
}

pub struct TextureDirectory {
    composites: IndexMap<WadName, CompositeTexture>,
    patches: Vec<(WadName, Option<Image>)>,
    patch_index: IndexMap<WadName, usize>,
    palettes: Vec<Palette>,
    flats: IndexMap<WadName, Image>,
}

impl TextureDirectory {
    pub fn from_archive(wad: &Archive) -> Result<TextureDirectory> {
        info!("Reading texture directory...");
        let palettes: Vec<Palette> = wad.required_named_lump(b"PLAYPAL\0")?.read_blobs()?;
        info!("  {:4} palettes", palettes.len());

        let patches = read_patches(wad)?;
        info!("  {:4} patches", patches.len());
        let mut patch_index = IndexMap::with_capacity(patches.len());
        for (index, &(name, _)) in patches.iter().enumerate() {
            patch_index.entry(name.to_ascii_uppercase()).or_insert(index);
        }

        let start_time = Instant::now();
        let mut composites = IndexMap::new();
        for &lump_name in TEXTURE_LUMP_NAMES {
            let lump = match wad.named_lump(lump_name)? {
                Some(lump) => lump,
                None => {
                    info!("     0 textures in {}", String::from_utf8_lossy(lump_name));
                    continue;
                }
            };
            let num_textures = read_textures(lump.bytes(), patches.len(), &mut composites)?;
            info!(
                "  {:4} textures in {}",
                num_textures,
                String::from_utf8_lossy(lump_name)
            );
        }
        debug!(
            "Read texture definitions in {:.2}ms.",
            start_time.elapsed().as_secs_f64() * 1000.0
        );

        let flats = read_flats(wad)?;
        info!("  {:4} flats", flats.len());

        Ok(TextureDirectory {
            composites,
            patches,
            patch_index,
            palettes,
            flats,
        })
    }

    pub fn num_palettes(&self) -> usize {
        self.palettes.len()
    }

    pub fn palette(&self, index: usize) -> Result<&Palette> {
        self.palettes
            .get(index)
            .ok_or_else(|| ErrorKind::missing_palette(index, self.palettes.len()).into())
    }

    pub fn num_patches(&self) -> usize {
        self.patches.len()
    }

    pub fn patch(&self, index: usize) -> Option<&Image> {
        self.patches.get(index).and_then(|(_, image)| image.as_ref())
    }

    /// Name lookups here and below ignore case.
    pub fn composite(&self, name: WadName) -> Option<&CompositeTexture> {
        self.composites.get(&name.to_ascii_uppercase())
    }

    pub fn texture_names(&self) -> impl Iterator<Item = WadName> + '_ {
        self.composites.values().map(|composite| composite.name)
    }

    /// Flat names, upper-cased.
    pub fn flat_names(&self) -> impl Iterator<Item = WadName> + '_ {
        self.flats.keys().cloned()
    }

    pub fn flat(&self, name: WadName) -> Option<&Image> {
        self.flats.get(&name.to_ascii_uppercase())
    }

    /// Draws every placement of `composite` in order into a fresh image.
    pub fn compose(&self, composite: &CompositeTexture) -> Result<Image> {
        let mut image = Image::new(composite.width, composite.height)?;
        for placement in &composite.placements {
            match self.patches.get(placement.patch) {
                Some(&(_, Some(ref patch))) => image.draw_patch(
                    patch,
                    isize::from(placement.origin_x),
                    isize::from(placement.origin_y),
                ),
                Some(&(ref patch_name, None)) => {
                    warn!(
                        "Patch {}, required by {} is missing.",
                        patch_name, composite.name
                    );
                }
                None => {
                    warn!(
                        "Patch index {} out of bounds ({}) in {}, skipping.",
                        placement.patch,
                        self.patches.len(),
                        composite.name
                    );
                }
            }
        }
        Ok(image)
    }

    /// Resolves `name` through the cache, the composite textures, the PNAMES
    /// patches and finally any lump with that name holding a patch.
    pub fn texture_rgba<'c>(
        &self,
        wad: &Archive,
        name: WadName,
        palette: usize,
        cache: &'c mut TextureCache,
    ) -> Result<&'c RgbaImage> {
        let key = (name.to_ascii_uppercase(), palette);
        if !cache.textures.contains_key(&key) {
            let palette = self.palette(palette)?;
            let rgba = if let Some(composite) = self.composite(name) {
                self.compose(composite)?.to_rgba(palette)
            } else if let Some(patch) = self.named_patch(name) {
                patch.to_rgba(palette)
            } else {
                loose_patch(wad, name, &mut cache.loose_patches)?.to_rgba(palette)
            };
            cache.textures.insert(key, rgba);
        }
        Ok(&cache.textures[&key])
    }

    pub fn flat_rgba<'c>(
        &self,
        name: WadName,
        palette: usize,
        cache: &'c mut TextureCache,
    ) -> Result<&'c RgbaImage> {
        let key = (name.to_ascii_uppercase(), palette);
        if !cache.flats.contains_key(&key) {
            let palette = self.palette(palette)?;
            let flat = self
                .flat(name)
                .ok_or_else(|| ErrorKind::MissingTexture(name.to_string()))?;
            cache.flats.insert(key, flat.to_rgba(palette));
        }
        Ok(&cache.flats[&key])
    }

    /// Renders every composite texture and flat with `palette`, returning the
    /// ones that failed. A composite missing any of its patches is a failure.
    pub fn check_textures(
        &self,
        wad: &Archive,
        palette: usize,
        cache: &mut TextureCache,
    ) -> Vec<(WadName, Error)> {
        let start_time = Instant::now();
        let mut failures = Vec::new();
        for composite in self.composites.values() {
            let missing = composite
                .placements
                .iter()
                .find(|placement| self.patch(placement.patch).is_none());
            if let Some(placement) = missing {
                let patch_name = match self.patches.get(placement.patch) {
                    Some(&(name, _)) => name.to_string(),
                    None => format!("#{}", placement.patch),
                };
                failures.push((composite.name, ErrorKind::MissingTexture(patch_name).into()));
                continue;
            }
            if let Err(error) = self.texture_rgba(wad, composite.name, palette, cache) {
                failures.push((composite.name, error));
            }
        }
        for &name in self.flats.keys() {
            if let Err(error) = self.flat_rgba(name, palette, cache) {
                failures.push((name, error));
            }
        }
        debug!(
            "Checked {} textures and {} flats in {:.2}ms, {} failures.",
            self.composites.len(),
            self.flats.len(),
            start_time.elapsed().as_secs_f64() * 1000.0,
            failures.len()
        );
        failures
    }

    fn named_patch(&self, name: WadName) -> Option<&Image> {
        self.patch_index
            .get(&name.to_ascii_uppercase())
            .and_then(|&index| self.patch(index))
    }
}

impl TextureSizes for TextureDirectory {
    fn texture_size(&self, name: WadName) -> Option<(usize, usize)> {
        if let Some(composite) = self.composite(name) {
            Some((composite.width, composite.height))
        } else {
            self.named_patch(name)
                .map(|patch| (patch.width(), patch.height()))
        }
    }

    fn flat_size(&self, name: WadName) -> Option<(usize, usize)> {
        self.flat(name).map(|flat| (flat.width(), flat.height()))
    }
}

fn loose_patch<'c>(
    wad: &Archive,
    name: WadName,
    loose_patches: &'c mut IndexMap<WadName, Image>,
) -> Result<&'c Image> {
    let key = name.to_ascii_uppercase();
    if !loose_patches.contains_key(&key) {
        let lump = match wad.named_lump(&name)? {
            Some(lump) if !lump.is_virtual() => lump,
            _ => bail!(ErrorKind::MissingTexture(name.to_string())),
        };
        let image = Image::from_patch(lump.bytes())
            .chain_err(|| ErrorKind::MissingTexture(name.to_string()))?;
        debug!("Loaded loose patch {} from lump {}.", name, lump.index());
        loose_patches.insert(key, image);
    }
    Ok(&loose_patches[&key])
}

const TEXTURE_LUMP_NAMES: &[&[u8; 8]] = &[b"TEXTURE1", b"TEXTURE2"];

fn read_patches(wad: &Archive) -> Result<Vec<(WadName, Option<Image>)>> {
    let pnames = match wad.named_lump(b"PNAMES\0\0")? {
        Some(lump) => lump,
        None => {
            info!("No PNAMES lump.");
            return Ok(Vec::new());
        }
    };
    let mut lump = pnames.bytes();
    let num_patches = lump
        .read_u32::<LittleEndian>()
        .chain_err(ErrorKind::missing_number_of_patches)? as usize;
    ensure!(
        lump.len() >= num_patches * 8,
        ErrorKind::bad_lump_size(pnames.index(), "PNAMES", lump.len(), 8)
    );

    let start_time = Instant::now();
    let mut patches = Vec::with_capacity(num_patches);
    let mut missing_patches = 0usize;
    for (i_patch, raw_name) in lump.chunks_exact(8).take(num_patches).enumerate() {
        let name = match WadName::from_bytes(raw_name) {
            Ok(name) => name,
            Err(error) => {
                error!("Failed to read patch name with index {}: {}", i_patch, error);
                patches.push((WadName::default(), None));
                continue;
            }
        };
        match wad.named_lump(&name)? {
            Some(lump) => {
                let image = match Image::from_patch(lump.bytes()) {
                    Ok(image) => Some(image),
                    Err(error) => {
                        error!("Skipping patch `{}`: {}", name, error);
                        None
                    }
                };
                patches.push((name, image));
            }
            None => {
                missing_patches += 1;
                patches.push((name, None));
            }
        }
    }
    debug!(
        "Read {} patches in {:.2}ms; {} missing.",
        patches.len(),
        start_time.elapsed().as_secs_f64() * 1000.0,
        missing_patches
    );
    Ok(patches)
}

fn read_textures(
    lump_buffer: &[u8],
    num_patches: usize,
    composites: &mut IndexMap<WadName, CompositeTexture>,
) -> Result<usize> {
    let mut lump = lump_buffer;
    let num_textures = lump
        .read_u32::<LittleEndian>()
        .chain_err(|| ErrorKind::textures_lump_too_small(lump_buffer.len(), 4))?
        as usize;
    let offsets_end = 4 + num_textures * 4;
    ensure!(
        offsets_end <= lump_buffer.len(),
        ErrorKind::textures_lump_too_small(lump_buffer.len(), offsets_end)
    );

    let mut offsets = &lump_buffer[4..offsets_end];
    for i_texture in 0..num_textures {
        let offset = offsets
            .read_u32::<LittleEndian>()
            .chain_err(|| ErrorKind::textures_lump_too_small(lump_buffer.len(), offsets_end))?
            as usize;
        match read_texture(lump_buffer, offset, num_patches) {
            Ok(composite) => {
                composites.insert(composite.name.to_ascii_uppercase(), composite);
            }
            Err(error) => error!("Skipping texture {}: {}", i_texture, error),
        }
    }
    Ok(num_textures)
}

fn read_texture(lump: &[u8], offset: usize, num_patches: usize) -> Result<CompositeTexture> {
    let header_end = offset + WadTextureHeader::SIZE;
    ensure!(
        header_end <= lump.len(),
        ErrorKind::textures_lump_too_small(lump.len(), header_end)
    );
    let header: WadTextureHeader = bincode::deserialize(&lump[offset..header_end])
        .chain_err(|| ErrorKind::MalformedWad(format!("Bad texture header at {}", offset)))?;

    let refs_end = header_end + usize::from(header.num_patches) * WadTexturePatchRef::SIZE;
    ensure!(
        refs_end <= lump.len(),
        ErrorKind::textures_lump_too_small(lump.len(), refs_end)
    );

    let mut placements = Vec::with_capacity(usize::from(header.num_patches));
    for raw_ref in lump[header_end..refs_end].chunks_exact(WadTexturePatchRef::SIZE) {
        let patch_ref: WadTexturePatchRef = bincode::deserialize(raw_ref).chain_err(|| {
            ErrorKind::MalformedWad(format!("Bad patch reference in {}", header.name))
        })?;
        if usize::from(patch_ref.patch) >= num_patches {
            warn!(
                "Texture {} references patch {} of {}.",
                header.name, patch_ref.patch, num_patches
            );
        }
        placements.push(PatchPlacement {
            origin_x: patch_ref.origin_x,
            origin_y: patch_ref.origin_y,
            patch: usize::from(patch_ref.patch),
        });
    }

    ensure!(
        usize::from(header.width) <= super::image::MAX_IMAGE_SIZE
            && usize::from(header.height) <= super::image::MAX_IMAGE_SIZE,
        ErrorKind::image_too_large(header.width.into(), header.height.into())
    );
    Ok(CompositeTexture {
        name: header.name,
        width: header.width.into(),
        height: header.height.into(),
        placements,
    })
}

fn read_flats(wad: &Archive) -> Result<IndexMap<WadName, Image>> {
    let mut flats = IndexMap::new();
    let start = wad.named_lump(b"F_START\0")?;
    let end = wad.named_lump(b"F_END\0\0\0")?;
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) => (start.index(), end.index()),
        _ => {
            info!("No F_START/F_END markers, no flats.");
            return Ok(flats);
        }
    };
    for i_lump in start + 1..end {
        let lump = wad.lump_by_index(i_lump)?;
        if lump.is_virtual() {
            continue;
        }
        match Image::from_flat(lump.bytes()) {
            Ok(flat) => {
                flats.insert(lump.name().to_ascii_uppercase(), flat);
            }
            Err(error) => error!("Skipping flat {}: {}", lump.name(), error),
        }
    }
    Ok(flats)
}
