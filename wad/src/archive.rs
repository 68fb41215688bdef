use super::errors::{ErrorKind, Result, ResultExt};
use super::name::IntoWadName;
use super::types::{WadInfo, WadLump, WadName, WadRecord};
use error_chain::ensure;
use indexmap::IndexMap;
use log::{debug, info};
use std::fmt::Debug;
use std::path::Path;
use std::vec::Vec;

/// A WAD file held in memory, with its lump directory indexed by name.
pub struct Archive {
    data: Vec<u8>,
    header: WadInfo,
    index_map: IndexMap<WadName, usize>,
    lumps: Vec<LumpInfo>,
    levels: Vec<usize>,
}

impl Archive {
    pub fn open<W>(wad_path: &W) -> Result<Archive>
    where
        W: AsRef<Path> + Debug,
    {
        info!("Loading wad file {:?}...", wad_path);
        let data = std::fs::read(wad_path.as_ref()).chain_err(ErrorKind::on_file_open)?;
        let archive = Archive::from_bytes(data)?;
        info!(
            "Loaded wad with {} lumps and {} levels.",
            archive.num_lumps(),
            archive.num_levels()
        );
        Ok(archive)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Archive> {
        let header = WadInfo::decode(&data)?;

        let num_lumps = header.num_lumps as usize;
        let directory_start = header.info_table_offset as usize;
        let directory_end = num_lumps
            .checked_mul(WadLump::SIZE)
            .and_then(|size| size.checked_add(directory_start));
        ensure!(
            num_lumps == 0 || directory_end.map_or(false, |end| end <= data.len()),
            ErrorKind::directory_out_of_bounds(
                header.info_table_offset,
                header.num_lumps,
                data.len()
            )
        );

        let mut lumps = Vec::with_capacity(num_lumps);
        let mut levels = Vec::with_capacity(64);
        let mut index_map = IndexMap::new();
        for i_lump in 0..num_lumps {
            let start = directory_start + i_lump * WadLump::SIZE;
            let fileinfo: WadLump = bincode::deserialize(&data[start..start + WadLump::SIZE])
                .chain_err(|| ErrorKind::bad_lump_info(i_lump))?;

            let offset = fileinfo.file_pos as usize;
            let size = fileinfo.size as usize;
            ensure!(
                offset
                    .checked_add(size)
                    .map_or(false, |end| end <= data.len()),
                ErrorKind::lump_out_of_bounds(
                    i_lump,
                    fileinfo.name.as_str(),
                    fileinfo.file_pos,
                    fileinfo.size,
                    data.len()
                )
            );

            // Later lumps shadow earlier ones with the same name.
            let key = fileinfo.name.to_ascii_uppercase();
            index_map.insert(key, lumps.len());
            lumps.push(LumpInfo {
                name: fileinfo.name,
                offset,
                size,
            });

            // A level marker is the lump right before "THINGS".
            if &key == b"THINGS\0\0" && i_lump > 0 {
                levels.push(i_lump - 1);
            }
        }
        debug!(
            "Read directory of {} lumps at offset {}.",
            num_lumps, directory_start
        );

        Ok(Archive {
            data,
            header,
            index_map,
            lumps,
            levels,
        })
    }

    pub fn identifier(&self) -> &[u8; 4] {
        &self.header.identifier
    }

    pub fn is_iwad(&self) -> bool {
        self.header.is_iwad()
    }

    pub fn num_lumps(&self) -> usize {
        self.lumps.len()
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level_lump(&self, level_index: usize) -> Result<LumpReader> {
        let &lump_index = self.levels.get(level_index).ok_or_else(|| {
            ErrorKind::IndexOutOfRange("levels", level_index, self.levels.len())
        })?;
        self.lump_by_index(lump_index)
    }

    pub fn level_names(&self) -> impl Iterator<Item = WadName> + '_ {
        self.levels.iter().map(move |&index| self.lumps[index].name)
    }

    pub fn level_by_name<'a, Q>(&self, name: &'a Q) -> Result<Option<usize>>
    where
        &'a Q: IntoWadName,
        Q: ?Sized,
    {
        let name = name.into_wad_name()?.to_ascii_uppercase();
        Ok(self
            .levels
            .iter()
            .position(|&index| self.lumps[index].name.to_ascii_uppercase() == name))
    }

    pub fn required_named_lump<'a, Q>(&self, name: &'a Q) -> Result<LumpReader>
    where
        &'a Q: IntoWadName,
        Q: ?Sized,
    {
        let name: WadName = name.into_wad_name()?;
        self.named_lump::<WadName>(&name)?
            .ok_or_else(|| ErrorKind::missing_required_lump(&name).into())
    }

    /// The last lump called `name`, compared without regard to case.
    pub fn named_lump<'a, Q>(&self, name: &'a Q) -> Result<Option<LumpReader>>
    where
        &'a Q: IntoWadName,
        Q: ?Sized,
    {
        let key = name.into_wad_name()?.to_ascii_uppercase();
        match self.index_map.get(&key) {
            Some(&index) => self.lump_by_index(index).map(Some),
            None => Ok(None),
        }
    }

    pub fn lump_by_index(&self, index: usize) -> Result<LumpReader> {
        Ok(LumpReader {
            archive: self,
            info: self
                .lumps
                .get(index)
                .ok_or_else(|| ErrorKind::IndexOutOfRange("lumps", index, self.lumps.len()))?,
            index,
        })
    }
}

#[derive(Copy, Clone)]
pub struct LumpReader<'a> {
    archive: &'a Archive,
    info: &'a LumpInfo,
    index: usize,
}

impl<'a> LumpReader<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> WadName {
        self.info.name
    }

    pub fn size(&self) -> usize {
        self.info.size
    }

    pub fn is_virtual(&self) -> bool {
        self.info.size == 0
    }

    pub fn bytes(&self) -> &'a [u8] {
        let LumpReader { info, archive, .. } = *self;
        &archive.data[info.offset..info.offset + info.size]
    }

    pub fn decode_vec<T: WadRecord>(&self) -> Result<Vec<T>> {
        let LumpReader { info, index, .. } = *self;
        ensure!(
            info.size % T::SIZE == 0,
            ErrorKind::bad_lump_size(index, info.name.as_str(), info.size, T::SIZE)
        );
        self.bytes()
            .chunks_exact(T::SIZE)
            .enumerate()
            .map(|(i_element, chunk)| {
                bincode::deserialize(chunk).chain_err(|| {
                    ErrorKind::bad_lump_element(index, info.name.as_str(), i_element)
                })
            })
            .collect()
    }

    pub fn read_blobs<B>(&self) -> Result<Vec<B>>
    where
        B: Default + AsMut<[u8]>,
    {
        let LumpReader { info, index, .. } = *self;
        let blob_size = B::default().as_mut().len();
        ensure!(
            blob_size > 0 && info.size > 0 && info.size % blob_size == 0,
            ErrorKind::bad_lump_size(index, info.name.as_str(), info.size, blob_size.max(1))
        );
        Ok(self
            .bytes()
            .chunks_exact(blob_size)
            .map(|chunk| {
                let mut blob = B::default();
                blob.as_mut().copy_from_slice(chunk);
                blob
            })
            .collect())
    }

    pub fn read_bytes(&self) -> Vec<u8> {
        self.bytes().to_vec()
    }
}

#[derive(Copy, Clone, Debug)]
struct LumpInfo {
    name: WadName,
    offset: usize,
    size: usize,
}

#[cfg(test)]
mod test {
    use super::Archive;
    use crate::types::{Palette, WadVertex};

    fn build_wad(lumps: &[(&[u8], &[u8])]) -> Vec<u8> {
        let mut data = b"PWAD".to_vec();
        data.extend_from_slice(&(lumps.len() as u32).to_le_bytes());
        data.extend_from_slice(&[0; 4]);
        let mut directory = Vec::new();
        for &(name, contents) in lumps {
            directory.extend_from_slice(&(data.len() as u32).to_le_bytes());
            directory.extend_from_slice(&(contents.len() as u32).to_le_bytes());
            let mut padded = [0u8; 8];
            padded[..name.len()].copy_from_slice(name);
            directory.extend_from_slice(&padded);
            data.extend_from_slice(contents);
        }
        let directory_offset = data.len() as u32;
        data[8..12].copy_from_slice(&directory_offset.to_le_bytes());
        data.extend_from_slice(&directory);
        data
    }

    #[test]
    fn test_empty_directory() {
        let archive = Archive::from_bytes(build_wad(&[])).unwrap();
        assert_eq!(archive.num_lumps(), 0);
        assert_eq!(archive.num_levels(), 0);
        assert!(archive.level_lump(0).is_err());
        assert!(archive.lump_by_index(0).is_err());
    }

    #[test]
    fn test_lumps_and_levels() {
        let vertices = [0u8, 0, 0, 0, 64, 0, 0xc0, 0xff];
        let wad = build_wad(&[
            (b"E1M1", b""),
            (b"THINGS", b""),
            (b"VERTEXES", &vertices),
            (b"MAP02", b""),
            (b"THINGS", b""),
            (b"Mixed", b"abc"),
        ]);
        let archive = Archive::from_bytes(wad).unwrap();
        assert_eq!(archive.num_lumps(), 6);
        assert_eq!(archive.num_levels(), 2);
        assert_eq!(archive.level_lump(1).unwrap().name().as_str(), "MAP02");
        assert_eq!(archive.level_by_name("MAP02").unwrap(), Some(1));
        assert!(archive.level_lump(0).unwrap().is_virtual());

        // THINGS appears twice; the later one wins.
        let things = archive.required_named_lump("THINGS").unwrap();
        assert_eq!(things.index(), 4);

        let mixed = archive.required_named_lump("Mixed").unwrap();
        assert_eq!(mixed.bytes(), b"abc");
        // Lookups ignore case; the stored name keeps it.
        let upper = archive.required_named_lump("MIXED").unwrap();
        assert_eq!(upper.index(), mixed.index());
        assert_eq!(upper.name().as_str(), "Mixed");
        assert_eq!(archive.named_lump("vertexes").unwrap().unwrap().index(), 2);
        assert_eq!(archive.level_by_name("map02").unwrap(), Some(1));
        assert!(archive.named_lump("MISSING").unwrap().is_none());

        let decoded: Vec<WadVertex> = archive
            .required_named_lump("VERTEXES")
            .unwrap()
            .decode_vec()
            .unwrap();
        assert_eq!(
            decoded,
            vec![WadVertex { x: 0, y: 0 }, WadVertex { x: 64, y: -64 }]
        );

        assert!(mixed.decode_vec::<WadVertex>().is_err());
        assert!(mixed.read_blobs::<Palette>().is_err());
    }

    #[test]
    fn test_out_of_bounds() {
        let mut wad = build_wad(&[(b"DATA", b"0123456789")]);
        // Bump the lump size past the end of the buffer.
        let size_offset = wad.len() - 12;
        wad[size_offset..size_offset + 4].copy_from_slice(&1000u32.to_le_bytes());
        assert!(Archive::from_bytes(wad).is_err());

        let mut wad = build_wad(&[(b"DATA", b"0123456789")]);
        wad[8..12].copy_from_slice(&5000u32.to_le_bytes());
        assert!(Archive::from_bytes(wad).is_err());

        assert!(Archive::from_bytes(b"IWAD\x01\0\0".to_vec()).is_err());
    }
}
