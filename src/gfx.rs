mod animation;
mod compositor;
mod frame_cache;

pub use animation::{Animation, DecodeOptions, GifInfo};
pub use compositor::{deinterlace, interlaced_row_order};

use std::ops::Range;
use std::sync::Arc;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable(Arc<[Color]>);

impl ColorTable {
    pub fn from_rgb_bytes(bytes: &[u8]) -> Self {
        bytes
            .chunks_exact(3)
            .map(|rgb| Color::new(rgb[0], rgb[1], rgb[2]))
            .collect()
    }

    pub fn get(&self, index: u8) -> Option<Color> {
        self.0.get(index as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn colors(&self) -> &[Color] {
        &self.0
    }
}

impl FromIterator<Color> for ColorTable {
    fn from_iter<I: IntoIterator<Item = Color>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    fn clip(&self, width: usize, height: usize) -> (Range<usize>, Range<usize>) {
        let clip_axis = |start: u16, len: u16, bound: usize| {
            let start = (start as usize).min(bound);
            let end = (start + len as usize).min(bound);
            start..end
        };

        (
            clip_axis(self.left, self.width, width),
            clip_axis(self.top, self.height, height),
        )
    }
}

/// The logical screen after some number of frames have been composited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl Canvas {
    pub fn new(width: usize, height: usize, fill: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// Writes one pixel, ignoring coordinates outside the canvas.
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Color]> {
        self.pixels.chunks_exact(self.width.max(1))
    }

    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|color| [color.r, color.g, color.b])
            .collect()
    }

    pub(crate) fn fill_rect(&mut self, rect: Rect, color: Color) {
        let (columns, rows) = rect.clip(self.width, self.height);
        for y in rows {
            let row_start = y * self.width;
            self.pixels[row_start + columns.start..row_start + columns.end].fill(color);
        }
    }

    /// Copies `rect` from `source`, which must have the same dimensions.
    pub(crate) fn restore_rect(&mut self, rect: Rect, source: &Canvas) {
        debug_assert_eq!((self.width, self.height), (source.width, source.height));

        let (columns, rows) = rect.clip(self.width, self.height);
        for y in rows {
            let span = y * self.width + columns.start..y * self.width + columns.end;
            self.pixels[span.clone()].copy_from_slice(&source.pixels[span]);
        }
    }
}
