pub use super::name::WadName;
use super::errors::{ErrorKind, Result};
use super::util::{is_subsector, subsector_index};
use error_chain::ensure;
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use std::result::Result as StdResult;

pub type LightLevel = i16;
pub type LinedefFlags = u16;
pub type SectorId = u16;
pub type SectorTag = u16;
pub type SectorType = u16;
pub type SidedefId = i16;
pub type SpecialType = u16;
pub type VertexId = u16;
pub type WadCoord = i16;
pub type SegId = u16;
pub type LinedefId = u16;
pub type ChildId = u16;

/// A fixed-size little-endian record stored back to back in a lump.
pub trait WadRecord: DeserializeOwned {
    const SIZE: usize;
}

macro_rules! wad_records {
    ($($record:ty => $size:expr),* $(,)*) => {
        $(impl WadRecord for $record {
            const SIZE: usize = $size;
        })*
    };
}

wad_records! {
    WadInfo => 12,
    WadLump => 16,
    WadVertex => 4,
    WadLinedef => 14,
    WadSidedef => 30,
    WadSector => 26,
    WadSubsector => 4,
    WadSeg => 12,
    WadNode => 28,
    WadTextureHeader => 22,
    WadTexturePatchRef => 10,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadInfo {
    pub identifier: [u8; 4],
    pub num_lumps: u32,
    pub info_table_offset: u32,
}

impl WadInfo {
    /// Decodes just the 12-byte header at the start of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<WadInfo> {
        ensure!(
            bytes.len() >= WadInfo::SIZE,
            ErrorKind::bad_wad_header(bytes.len())
        );
        let info: WadInfo = bincode::deserialize(&bytes[..WadInfo::SIZE])
            .map_err(|_| ErrorKind::bad_wad_header(bytes.len()))?;
        ensure!(
            &info.identifier == b"IWAD" || &info.identifier == b"PWAD",
            ErrorKind::bad_wad_header_identifier(&info.identifier)
        );
        Ok(info)
    }

    pub fn is_iwad(&self) -> bool {
        &self.identifier == b"IWAD"
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadLump {
    pub file_pos: u32,
    pub size: u32,
    pub name: WadName,
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct WadVertex {
    pub x: WadCoord,
    pub y: WadCoord,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadLinedef {
    pub start_vertex: VertexId,
    pub end_vertex: VertexId,
    pub flags: LinedefFlags,
    pub special_type: SpecialType,
    pub sector_tag: SectorTag,
    pub right_side: SidedefId,
    pub left_side: SidedefId,
}

impl WadLinedef {
    pub fn impassable(&self) -> bool {
        self.flags & 0x0001 != 0
    }

    pub fn blocks_monsters(&self) -> bool {
        self.flags & 0x0002 != 0
    }

    pub fn is_two_sided(&self) -> bool {
        self.flags & 0x0004 != 0
    }

    pub fn upper_unpegged(&self) -> bool {
        self.flags & 0x0008 != 0
    }

    pub fn lower_unpegged(&self) -> bool {
        self.flags & 0x0010 != 0
    }

    pub fn secret(&self) -> bool {
        self.flags & 0x0020 != 0
    }

    pub fn blocks_sound(&self) -> bool {
        self.flags & 0x0040 != 0
    }

    pub fn never_shown_on_map(&self) -> bool {
        self.flags & 0x0080 != 0
    }

    pub fn always_shown_on_map(&self) -> bool {
        self.flags & 0x0100 != 0
    }

    /// The front sidedef index, `None` when stored as -1.
    pub fn front_side(&self) -> Option<usize> {
        side_index(self.right_side)
    }

    pub fn back_side(&self) -> Option<usize> {
        side_index(self.left_side)
    }
}

fn side_index(side: SidedefId) -> Option<usize> {
    if side < 0 {
        None
    } else {
        Some(side as usize)
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadSidedef {
    pub x_offset: WadCoord,
    pub y_offset: WadCoord,
    pub upper_texture: WadName,
    pub lower_texture: WadName,
    pub middle_texture: WadName,
    pub sector: SectorId,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadSector {
    pub floor_height: WadCoord,
    pub ceiling_height: WadCoord,
    pub floor_texture: WadName,
    pub ceiling_texture: WadName,
    pub light: LightLevel,
    pub sector_type: SectorType,
    pub tag: SectorTag,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadSubsector {
    pub num_segs: u16,
    pub first_seg: SegId,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadSeg {
    pub start_vertex: VertexId,
    pub end_vertex: VertexId,
    pub angle: i16,
    pub linedef: LinedefId,
    pub direction: u16,
    pub offset: u16,
}

impl WadSeg {
    /// Whether the seg runs along its linedef's front side.
    pub fn is_front(&self) -> bool {
        self.direction == 0
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadBoundingBox {
    pub top: WadCoord,
    pub bottom: WadCoord,
    pub left: WadCoord,
    pub right: WadCoord,
}

/// A node child, decoded once from the on-disk id whose high bit marks a
/// subsector.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Child {
    Node(usize),
    Subsector(usize),
}

impl Child {
    pub fn from_raw(id: ChildId) -> Child {
        if is_subsector(id) {
            Child::Subsector(subsector_index(id))
        } else {
            Child::Node(id as usize)
        }
    }
}

impl<'de> Deserialize<'de> for Child {
    fn deserialize<D>(deserializer: D) -> StdResult<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Child::from_raw(ChildId::deserialize(deserializer)?))
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadNode {
    pub line_x: WadCoord,
    pub line_y: WadCoord,
    pub step_x: WadCoord,
    pub step_y: WadCoord,
    pub bounds: [WadBoundingBox; 2],
    pub children: [Child; 2],
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadTextureHeader {
    pub name: WadName,
    pub flags: u32,
    pub width: u16,
    pub height: u16,
    pub column_directory: u32,
    pub num_patches: u16,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct WadTexturePatchRef {
    pub origin_x: i16,
    pub origin_y: i16,
    pub patch: u16,
    pub stepdir: u16,
    pub colormap: u16,
}

pub const PALETTE_SIZE: usize = 256 * 3;

pub struct Palette(pub [u8; PALETTE_SIZE]);

impl Palette {
    pub fn color(&self, index: u8) -> [u8; 3] {
        let offset = usize::from(index) * 3;
        [self.0[offset], self.0[offset + 1], self.0[offset + 2]]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette([0u8; PALETTE_SIZE])
    }
}

impl AsMut<[u8]> for Palette {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

#[cfg(test)]
mod test {
    use super::{Child, WadInfo, WadNode, WadRecord, WadSeg};

    #[test]
    fn test_header_decode() {
        let mut bytes = b"IWAD".to_vec();
        bytes.extend_from_slice(&10u32.to_le_bytes());
        bytes.extend_from_slice(&12345u32.to_le_bytes());
        let info = WadInfo::decode(&bytes).unwrap();
        assert!(info.is_iwad());
        assert_eq!(info.num_lumps, 10);
        assert_eq!(info.info_table_offset, 12345);

        assert!(WadInfo::decode(&bytes[..11]).is_err());
        bytes[0] = b'X';
        assert!(WadInfo::decode(&bytes).is_err());
    }

    #[test]
    fn test_child_tag() {
        assert_eq!(Child::from_raw(0x8003), Child::Subsector(3));
        assert_eq!(Child::from_raw(0x8000), Child::Subsector(0));
        assert_eq!(Child::from_raw(0x7fff), Child::Node(0x7fff));
        assert_eq!(Child::from_raw(7), Child::Node(7));
    }

    #[test]
    fn test_node_layout() {
        let mut bytes = Vec::new();
        for value in &[64i16, -32, 0, 128] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        for value in &[10i16, 0, 0, 10, 20, 10, 0, 10] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.extend_from_slice(&0x8001u16.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        assert_eq!(bytes.len(), WadNode::SIZE);

        let node: WadNode = bincode::deserialize(&bytes).unwrap();
        assert_eq!((node.line_x, node.line_y), (64, -32));
        assert_eq!((node.step_x, node.step_y), (0, 128));
        assert_eq!(node.bounds[1].top, 20);
        assert_eq!(node.children, [Child::Subsector(1), Child::Node(2)]);
    }

    #[test]
    fn test_seg_direction() {
        let bytes = [1u8, 0, 2, 0, 0, 0x40, 5, 0, 1, 0, 8, 0];
        assert_eq!(bytes.len(), WadSeg::SIZE);
        let seg: WadSeg = bincode::deserialize(&bytes).unwrap();
        assert_eq!((seg.start_vertex, seg.end_vertex), (1, 2));
        assert_eq!(seg.angle, 0x4000);
        assert_eq!(seg.linedef, 5);
        assert!(!seg.is_front());
        assert_eq!(seg.offset, 8);
    }
}
