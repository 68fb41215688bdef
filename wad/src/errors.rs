use error_chain::error_chain;
use std::fmt::Debug;

error_chain! {
    foreign_links {}
    errors {
        MalformedWad(message: String) {
            description("Malformed WAD file.")
            display("Malformed WAD file: {}", message)
        }
        IndexOutOfRange(table: &'static str, index: usize, len: usize) {
            description("Index out of range.")
            display("Index {} out of range for {} (len={})", index, table, len)
        }
        ReconstructionIncomplete(sector: usize, message: String) {
            description("Sector outline could not be reconstructed.")
            display("Sector {} outline could not be reconstructed: {}", sector, message)
        }
        EarClippingStalled(remaining: usize) {
            description("Ear clipping made no progress.")
            display("Ear clipping made no progress with {} vertices left", remaining)
        }
        TooFewVertices(count: usize) {
            description("Polygon has too few vertices.")
            display("Polygon has too few vertices: {}", count)
        }
        NullInput {
            description("No polygon vertices given.")
            display("No polygon vertices given.")
        }
        MissingTexture(name: String) {
            description("Missing texture.")
            display("Missing texture `{}`", name)
        }
        CorruptConfig(message: String) {
            description("Corrupt configuration file.")
            display("Corrupt configuration file: {}", message)
        }
        Io(message: String) {
            description("I/O WAD error.")
            display("I/O WAD error: {}", message)
        }
    }
    links {}
}

impl ErrorKind {
    pub fn invalid_byte_in_wad_name(byte: u8, bytes: &[u8]) -> ErrorKind {
        ErrorKind::MalformedWad(format!(
            "Invalid byte `{:#04x}` in wad name `{}`.",
            byte,
            String::from_utf8_lossy(bytes),
        ))
    }

    pub fn wad_name_too_long(bytes: &[u8]) -> ErrorKind {
        ErrorKind::MalformedWad(format!(
            "Wad name too long `{}`.",
            String::from_utf8_lossy(bytes)
        ))
    }

    pub fn bad_wad_header(size: usize) -> ErrorKind {
        ErrorKind::MalformedWad(format!(
            "Could not read WAD header, buffer is {} bytes.",
            size
        ))
    }

    pub fn bad_wad_header_identifier(identifier: &[u8]) -> ErrorKind {
        ErrorKind::MalformedWad(format!(
            "Invalid header identifier: {}",
            String::from_utf8_lossy(identifier)
        ))
    }

    pub fn directory_out_of_bounds(offset: u32, num_lumps: u32, size: usize) -> ErrorKind {
        ErrorKind::MalformedWad(format!(
            "Directory of {} lumps at offset {} exceeds buffer of {} bytes",
            num_lumps, offset, size
        ))
    }

    pub fn bad_lump_info(lump_index: usize) -> ErrorKind {
        ErrorKind::MalformedWad(format!("Invalid lump info for lump {}", lump_index))
    }

    pub fn lump_out_of_bounds(
        lump_index: usize,
        name: &str,
        offset: u32,
        lump_size: u32,
        size: usize,
    ) -> ErrorKind {
        ErrorKind::MalformedWad(format!(
            "Lump `{}` (index={}) at offset {} with size {} exceeds buffer of {} bytes",
            name, lump_index, offset, lump_size, size
        ))
    }

    pub fn bad_lump_element(lump_index: usize, lump_name: &str, element_index: usize) -> ErrorKind {
        ErrorKind::MalformedWad(format!(
            "Invalid element {} in lump `{}` (index={})",
            element_index, lump_name, lump_index
        ))
    }

    pub fn bad_lump_size(
        index: usize,
        name: &str,
        total_size: usize,
        element_size: usize,
    ) -> ErrorKind {
        ErrorKind::MalformedWad(format!(
            "Invalid lump size in `{}` (index={}): total={}, element={}, div={}, mod={}",
            name,
            index,
            total_size,
            element_size,
            total_size / element_size,
            total_size % element_size
        ))
    }

    pub fn missing_required_lump<N: Debug>(name: &N) -> ErrorKind {
        ErrorKind::MalformedWad(format!("Missing required lump {:?}", name))
    }

    pub fn bad_level_lump(level: &str, expected: &str, found: &str) -> ErrorKind {
        ErrorKind::MalformedWad(format!(
            "Level `{}` is missing lump `{}`, found `{}` instead",
            level, expected, found
        ))
    }

    pub fn bad_reference(
        table: &str,
        index: usize,
        target: &str,
        target_index: usize,
        target_len: usize,
    ) -> ErrorKind {
        ErrorKind::MalformedWad(format!(
            "{} {} references {} {}, but there are only {}",
            table, index, target, target_index, target_len
        ))
    }

    pub fn shared_bsp_child(node: usize, target: &str, target_index: usize) -> ErrorKind {
        ErrorKind::MalformedWad(format!(
            "Node {} references {} {}, which already has a parent",
            node, target, target_index
        ))
    }

    pub fn cyclic_bsp(depth: usize) -> ErrorKind {
        ErrorKind::MalformedWad(format!("BSP tree deeper than {} nodes, it must be cyclic", depth))
    }

    pub fn truncated_image(what: &str, column: usize, width: usize, height: usize) -> ErrorKind {
        ErrorKind::MalformedWad(format!(
            "Image truncated while reading {} in column {} ({}x{})",
            what, column, width, height
        ))
    }

    pub fn image_too_large(width: usize, height: usize) -> ErrorKind {
        ErrorKind::MalformedWad(format!("Image too large {}x{}.", width, height))
    }

    pub fn textures_lump_too_small(lump_len: usize, required: usize) -> ErrorKind {
        ErrorKind::MalformedWad(format!(
            "Textures lump too small: {} < {}",
            lump_len, required
        ))
    }

    pub fn missing_number_of_patches() -> ErrorKind {
        ErrorKind::MalformedWad("Missing number of patches in PNAMES".to_owned())
    }

    pub fn missing_palette(index: usize, num_palettes: usize) -> ErrorKind {
        ErrorKind::IndexOutOfRange("palettes", index, num_palettes)
    }

    pub fn on_file_open() -> ErrorKind {
        ErrorKind::Io("Failed to read file.".to_owned())
    }

    pub fn on_config_read() -> ErrorKind {
        ErrorKind::Io("Failed to load configuration to memory.".to_owned())
    }

    pub fn on_config_parse() -> ErrorKind {
        ErrorKind::CorruptConfig("Failed to parse configuration file.".to_owned())
    }
}
