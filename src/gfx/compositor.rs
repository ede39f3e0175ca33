use super::{Canvas, Color};
use crate::parser::{decompress, Decompressed, DisposalMethod, FrameDescriptor, GifHeader};

use log::{trace, warn};

/// (first row, row stride) of the four interlace passes.
const INTERLACE_PASSES: [(usize, usize); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];

/// Canonical row numbers in the order an interlaced image transmits them.
pub fn interlaced_row_order(height: usize) -> impl Iterator<Item = usize> {
    INTERLACE_PASSES
        .into_iter()
        .flat_map(move |(start, step)| (start..height).step_by(step))
}

/// Reorders interlaced rows into top-to-bottom order.
///
/// Rows missing from a short `indices` are left as zero.
pub fn deinterlace(indices: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut result = vec![0; width * height];
    if width == 0 {
        return result;
    }

    for (transmitted, row) in indices.chunks_exact(width).zip(interlaced_row_order(height)) {
        result[row * width..(row + 1) * width].copy_from_slice(transmitted);
    }
    result
}

/// Paints frames onto a canvas holding the state left by the frames before them.
pub(crate) struct Compositor<'a> {
    header: &'a GifHeader,
    frames: &'a [FrameDescriptor],
    background: Color,
}

impl<'a> Compositor<'a> {
    pub(crate) fn new(header: &'a GifHeader, frames: &'a [FrameDescriptor]) -> Self {
        Self {
            header,
            frames,
            background: header.background_color().unwrap_or(Color::BLACK),
        }
    }

    /// The screen before frame 0: background color over the whole logical screen.
    pub(crate) fn blank_canvas(&self) -> Canvas {
        Canvas::new(
            self.header.width as usize,
            self.header.height as usize,
            self.background,
        )
    }

    /// Advances `canvas` from the state after frame `index - 1` to the state after `index`.
    ///
    /// `restore_point` is the snapshot returned for frame `index - 1`. When frame `index`
    /// is itself restored-to-previous, the canvas is snapshotted before the previous
    /// frame is disposed and that snapshot is returned.
    pub(crate) fn composite(
        &self,
        canvas: &mut Canvas,
        index: usize,
        restore_point: Option<&Canvas>,
    ) -> Option<Canvas> {
        let frame = &self.frames[index];
        let snapshot = (frame.disposal_method() == DisposalMethod::RestoreToPrevious)
            .then(|| canvas.clone());

        if let Some(previous) = index.checked_sub(1).and_then(|i| self.frames.get(i)) {
            self.dispose(canvas, previous, restore_point);
        }

        paint(canvas, frame);
        snapshot
    }

    fn dispose(&self, canvas: &mut Canvas, previous: &FrameDescriptor, restore_point: Option<&Canvas>) {
        match previous.disposal_method() {
            DisposalMethod::Unspecified | DisposalMethod::DoNotDispose => {},
            DisposalMethod::RestoreToBackgroundColor => {
                trace!("restoring {:?} to background", previous.rect());
                canvas.fill_rect(previous.rect(), self.background);
            },
            DisposalMethod::RestoreToPrevious => match restore_point {
                Some(snapshot) => {
                    trace!("restoring {:?} to previous", previous.rect());
                    canvas.restore_rect(previous.rect(), snapshot);
                },
                None => trace!("no snapshot to restore {:?} from", previous.rect()),
            },
        }
    }
}

/// Decodes a frame and draws its opaque, in-table pixels; everything off-canvas is clipped.
///
/// Only the rows up to the last one that lands on the canvas are decompressed.
pub(crate) fn paint(canvas: &mut Canvas, frame: &FrameDescriptor) {
    let Some(color_table) = frame.color_table.as_ref() else {
        trace!("frame has no color table, nothing to paint");
        return;
    };

    let left = frame.left as usize;
    let top = frame.top as usize;
    let width = frame.width as usize;
    let height = frame.height as usize;
    if width == 0 || height == 0 || left >= canvas.width() || top >= canvas.height() {
        trace!("frame {:?} has no pixels on the canvas", frame.rect());
        return;
    }

    let visible_rows = height.min(canvas.height() - top);
    let visible_columns = width.min(canvas.width() - left);

    // frame rows in the order they are transmitted
    let row_order: Vec<usize> = if frame.interlaced {
        interlaced_row_order(height).collect()
    } else {
        (0..visible_rows).collect()
    };
    let needed_rows = row_order
        .iter()
        .rposition(|&row| row < visible_rows)
        .map_or(0, |position| position + 1);

    let Decompressed { indices, corruption } =
        decompress(&frame.image_data, frame.lzw_minimum_code_size, width * needed_rows);
    if let Some(err) = corruption {
        warn!("corrupt LZW stream after {} of {} indices: {err}", indices.len(), frame.pixel_count());
    }
    // a short stream repeats its last index, or zero when nothing was decoded
    let padding = indices.last().copied().unwrap_or(0);

    let transparent = frame.transparent_color_index();
    for (transmitted, &y) in row_order[..needed_rows].iter().enumerate() {
        if y >= visible_rows {
            continue;
        }

        let row_start = transmitted * width;
        for x in 0..visible_columns {
            let index = indices.get(row_start + x).copied().unwrap_or(padding);
            if Some(index) == transparent {
                continue;
            }
            if let Some(color) = color_table.get(index) {
                canvas.set_pixel(left + x, top + y, color);
            }
        }
    }
}
