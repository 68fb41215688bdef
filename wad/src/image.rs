use super::errors::{ErrorKind, Result, ResultExt};
use super::types::Palette;
use byteorder::{LittleEndian, ReadBytesExt};
use error_chain::ensure;
use std::vec::Vec;

pub const MAX_IMAGE_SIZE: usize = 4096;

/// Pixel value for holes in a patch. Any value with the high bit set is
/// transparent; opaque pixels hold a palette index in the low byte.
pub const TRANSPARENT: u16 = 0xff00;

const FLAT_WIDTH: usize = 64;

/// An indexed-color image, row 0 at the top.
#[derive(Clone, Debug)]
pub struct Image {
    width: usize,
    height: usize,
    x_offset: isize,
    y_offset: isize,
    pixels: Vec<u16>,
}

impl Image {
    pub fn new(width: usize, height: usize) -> Result<Image> {
        ensure!(
            width <= MAX_IMAGE_SIZE && height <= MAX_IMAGE_SIZE,
            ErrorKind::image_too_large(width, height)
        );
        Ok(Image {
            width,
            height,
            x_offset: 0,
            y_offset: 0,
            pixels: vec![TRANSPARENT; width * height],
        })
    }

    /// Decodes a patch: a header, one offset per column, then per column a
    /// stream of posts ended by a 0xff row.
    pub fn from_patch(buffer: &[u8]) -> Result<Image> {
        let mut reader = buffer;
        let width = reader
            .read_u16::<LittleEndian>()
            .chain_err(|| ErrorKind::truncated_image("width", 0, 0, 0))?
            as usize;
        let height = reader
            .read_u16::<LittleEndian>()
            .chain_err(|| ErrorKind::truncated_image("height", 0, width, 0))?
            as usize;
        let mut image = Image::new(width, height)?;
        image.x_offset = reader
            .read_i16::<LittleEndian>()
            .chain_err(|| ErrorKind::truncated_image("x offset", 0, width, height))?
            as isize;
        image.y_offset = reader
            .read_i16::<LittleEndian>()
            .chain_err(|| ErrorKind::truncated_image("y offset", 0, width, height))?
            as isize;

        for i_column in 0..width {
            let offset = reader
                .read_u32::<LittleEndian>()
                .chain_err(|| ErrorKind::truncated_image("column offset", i_column, width, height))?
                as usize;
            ensure!(
                offset < buffer.len(),
                ErrorKind::MalformedWad(format!(
                    "Invalid column offset in {}, offset={}, size={}",
                    i_column,
                    offset,
                    buffer.len()
                ))
            );
            image.read_column(&buffer[offset..], i_column)?;
        }
        Ok(image)
    }

    fn read_column(&mut self, mut source: &[u8], i_column: usize) -> Result<()> {
        let (width, height) = (self.width, self.height);
        let truncated = |what| ErrorKind::truncated_image(what, i_column, width, height);
        loop {
            let row_start = *source.get(0).ok_or_else(|| truncated("post row"))? as usize;
            if row_start == 0xff {
                return Ok(());
            }

            // Length, a padding byte, the pixels, then another padding byte.
            let run_length = *source.get(1).ok_or_else(|| truncated("post length"))? as usize;
            ensure!(source.len() >= run_length + 4, truncated("post pixels"));
            ensure!(
                row_start + run_length <= height,
                ErrorKind::MalformedWad(format!(
                    "Post too big: column {} ({} +{}), size {}x{}",
                    i_column, row_start, run_length, width, height
                ))
            );

            for (i_row, &index) in source[3..3 + run_length].iter().enumerate() {
                self.pixels[(row_start + i_row) * width + i_column] = u16::from(index);
            }
            source = &source[run_length + 4..];
        }
    }

    /// A raw floor/ceiling image: 64 indices per row, no transparency.
    pub fn from_flat(buffer: &[u8]) -> Result<Image> {
        ensure!(
            !buffer.is_empty() && buffer.len() % FLAT_WIDTH == 0,
            ErrorKind::MalformedWad(format!("Invalid flat size {}", buffer.len()))
        );
        let mut image = Image::new(FLAT_WIDTH, buffer.len() / FLAT_WIDTH)?;
        for (pixel, &index) in image.pixels.iter_mut().zip(buffer) {
            *pixel = u16::from(index);
        }
        Ok(image)
    }

    /// Draws the opaque pixels of `patch` with its top-left corner at
    /// `(origin_x, origin_y)`. Columns outside the image are clipped, rows
    /// above the top wrap around to the bottom and rows below it are dropped.
    pub fn draw_patch(&mut self, patch: &Image, origin_x: isize, origin_y: isize) {
        let (width, height) = (self.width as isize, self.height as isize);
        if height == 0 {
            return;
        }
        for patch_x in 0..patch.width {
            let x = origin_x + patch_x as isize;
            if x < 0 || x >= width {
                continue;
            }
            for patch_y in 0..patch.height {
                let pixel = patch.pixels[patch_y * patch.width + patch_x];
                if is_transparent(pixel) {
                    continue;
                }
                let mut y = origin_y + patch_y as isize;
                if y < 0 {
                    y = y.rem_euclid(height);
                } else if y >= height {
                    continue;
                }
                self.pixels[(y * width + x) as usize] = pixel;
            }
        }
    }

    pub fn to_rgba(&self, palette: &Palette) -> RgbaImage {
        let mut pixels = Vec::with_capacity(self.pixels.len() * 4);
        for &pixel in &self.pixels {
            if is_transparent(pixel) {
                pixels.extend_from_slice(&[0, 0, 0, 0]);
            } else {
                let [r, g, b] = palette.color(pixel as u8);
                pixels.extend_from_slice(&[r, g, b, 255]);
            }
        }
        RgbaImage {
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    /// The palette index at `(x, y)`, `None` if transparent or outside.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let pixel = self.pixels[y * self.width + x];
        if is_transparent(pixel) {
            None
        } else {
            Some(pixel as u8)
        }
    }

    pub fn x_offset(&self) -> isize {
        self.x_offset
    }

    pub fn y_offset(&self) -> isize {
        self.y_offset
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }
}

fn is_transparent(pixel: u16) -> bool {
    pixel & 0x8000 != 0
}

/// Tightly packed RGBA8 pixels, row 0 at the top.
#[derive(Clone, Debug, PartialEq)]
pub struct RgbaImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl RgbaImage {
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let offset = (y * self.width + x) * 4;
        [
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
            self.pixels[offset + 3],
        ]
    }

    /// Reverses row order, for consumers expecting row 0 at the bottom.
    pub fn flip_vertical(&mut self) {
        let pitch = self.width * 4;
        for row in 0..self.height / 2 {
            let mirror = self.height - 1 - row;
            let (top, bottom) = self.pixels.split_at_mut(mirror * pitch);
            top[row * pitch..(row + 1) * pitch].swap_with_slice(&mut bottom[..pitch]);
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::{Image, TRANSPARENT};
    use crate::types::Palette;

    /// Encodes a patch from columns of `(row_start, pixels)` posts.
    pub(crate) fn encode_patch(height: u16, columns: &[Vec<(u8, Vec<u8>)>]) -> Vec<u8> {
        let mut header = Vec::new();
        header.extend_from_slice(&(columns.len() as u16).to_le_bytes());
        header.extend_from_slice(&height.to_le_bytes());
        header.extend_from_slice(&[0; 4]);

        let mut posts = Vec::new();
        let posts_start = header.len() + columns.len() * 4;
        for column in columns {
            header.extend_from_slice(&((posts_start + posts.len()) as u32).to_le_bytes());
            for &(row_start, ref pixels) in column {
                posts.push(row_start);
                posts.push(pixels.len() as u8);
                posts.push(0);
                posts.extend_from_slice(pixels);
                posts.push(0);
            }
            posts.push(0xff);
        }
        header.extend_from_slice(&posts);
        header
    }

    pub(crate) fn palette_with(index: u8, color: [u8; 3]) -> Palette {
        let mut palette = Palette::default();
        let offset = usize::from(index) * 3;
        palette.0[offset..offset + 3].copy_from_slice(&color);
        palette
    }

    #[test]
    fn test_single_red_pixel() {
        let patch = Image::from_patch(&encode_patch(1, &[vec![(0, vec![5])]])).unwrap();
        assert_eq!((patch.width(), patch.height()), (1, 1));
        assert_eq!(patch.pixel(0, 0), Some(5));

        let rgba = patch.to_rgba(&palette_with(5, [255, 0, 0]));
        assert_eq!(rgba.pixels, vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_empty_column_is_transparent() {
        let patch = Image::from_patch(&encode_patch(3, &[vec![], vec![(1, vec![7])]])).unwrap();
        for y in 0..3 {
            assert_eq!(patch.pixel(0, y), None);
        }
        assert_eq!(patch.pixels()[0], TRANSPARENT);
        assert_eq!(patch.pixel(1, 0), None);
        assert_eq!(patch.pixel(1, 1), Some(7));

        let rgba = patch.to_rgba(&Palette::default());
        assert_eq!(rgba.pixel(0, 1), [0, 0, 0, 0]);
        assert_eq!(rgba.pixel(1, 1)[3], 255);
    }

    #[test]
    fn test_truncated_patch() {
        let mut bytes = encode_patch(4, &[vec![(0, vec![1, 2, 3])]]);
        assert!(Image::from_patch(&bytes[..6]).is_err());
        bytes.truncate(bytes.len() - 3);
        assert!(Image::from_patch(&bytes).is_err());

        // A post running past the bottom.
        let bytes = encode_patch(2, &[vec![(1, vec![1, 2])]]);
        assert!(Image::from_patch(&bytes).is_err());
    }

    #[test]
    fn test_draw_patch() {
        let patch = Image::from_patch(&encode_patch(
            2,
            &[vec![(0, vec![1, 2])], vec![(0, vec![3])]],
        ))
        .unwrap();

        let mut image = Image::new(3, 4).unwrap();
        image.draw_patch(&patch, 2, 1);
        assert_eq!(image.pixel(2, 1), Some(1));
        assert_eq!(image.pixel(2, 2), Some(2));
        // Second column clipped on the right.
        assert_eq!(image.pixels().iter().filter(|&&p| p != TRANSPARENT).count(), 2);

        // Rows above the top wrap to the bottom; rows past the bottom vanish.
        let mut image = Image::new(2, 4).unwrap();
        image.draw_patch(&patch, 0, -1);
        assert_eq!(image.pixel(0, 3), Some(1));
        assert_eq!(image.pixel(0, 0), Some(2));
        assert_eq!(image.pixel(1, 3), Some(3));

        let mut image = Image::new(2, 2).unwrap();
        image.draw_patch(&patch, 0, 1);
        assert_eq!(image.pixel(0, 1), Some(1));
        assert_eq!(image.pixel(0, 0), None);

        // Later patches overwrite only where they are opaque.
        let cover = Image::from_patch(&encode_patch(2, &[vec![(1, vec![9])]])).unwrap();
        let mut image = Image::new(1, 2).unwrap();
        image.draw_patch(&patch, 0, 0);
        image.draw_patch(&cover, 0, 0);
        assert_eq!(image.pixel(0, 0), Some(1));
        assert_eq!(image.pixel(0, 1), Some(9));
    }

    #[test]
    fn test_flat_and_flip() {
        let mut bytes = vec![1u8; 64 * 64];
        bytes[0] = 2;
        let flat = Image::from_flat(&bytes).unwrap();
        assert_eq!((flat.width(), flat.height()), (64, 64));
        assert_eq!(flat.pixel(0, 0), Some(2));
        assert!(Image::from_flat(&bytes[..100]).is_err());

        let mut rgba = flat.to_rgba(&palette_with(2, [0, 0, 200]));
        assert_eq!(rgba.pixel(0, 0), [0, 0, 200, 255]);
        rgba.flip_vertical();
        assert_eq!(rgba.pixel(0, 63), [0, 0, 200, 255]);
        assert_eq!(rgba.pixel(0, 0), [0, 0, 0, 255]);
    }
}
