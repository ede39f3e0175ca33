use crate::gfx::Animation;
use crate::png_writer::{self, EncodeError};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, warn};
use serde::Serialize;

use std::ops::ControlFlow;

const DATA_URI_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Frames per batch handed to the callback. Values below 1 are treated as 1.
    pub batch_size: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub loaded: usize,
    pub total: usize,
}

/// PNG-encoded frames produced since the previous batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameBatch {
    pub progress: Progress,
    /// `None` for frames that could not be encoded.
    pub frames: Vec<Option<Vec<u8>>>,
}

/// Composites frame `index` and encodes it as a PNG the size of the logical screen.
pub fn encode_frame(animation: &mut Animation, index: usize) -> Result<Option<Vec<u8>>, EncodeError> {
    let Some(canvas) = animation.get_frame(index) else {
        return Ok(None);
    };

    let header = animation.header();
    png_writer::encode_png(header.width.into(), header.height.into(), &canvas).map(Some)
}

/// Encodes every frame in order, handing them to `on_batch` in groups.
///
/// Returns the number of frames encoded before the export finished or was stopped.
pub fn export_frames<F>(animation: &mut Animation, options: &ExportOptions, mut on_batch: F) -> usize
where
    F: FnMut(FrameBatch) -> ControlFlow<()>,
{
    let total = animation.frame_count();
    let batch_size = options.batch_size.max(1);
    let mut frames = Vec::with_capacity(batch_size.min(total));

    debug!("exporting {total} frames in batches of {batch_size}");

    for index in 0..total {
        let png = match encode_frame(animation, index) {
            Ok(png) => png,
            Err(err) => {
                warn!("failed to encode frame {index}: {err}");
                None
            },
        };
        frames.push(png);

        let loaded = index + 1;
        if frames.len() == batch_size || loaded == total {
            let batch = FrameBatch {
                progress: Progress { loaded, total },
                frames: std::mem::take(&mut frames),
            };

            if on_batch(batch).is_break() {
                debug!("export stopped after {loaded} of {total} frames");
                return loaded;
            }
        }
    }

    total
}

/// Wraps PNG bytes in a `data:` URI.
pub fn to_data_uri(png: &[u8]) -> String {
    let mut uri = String::with_capacity(DATA_URI_PREFIX.len() + png.len().div_ceil(3) * 4);
    uri.push_str(DATA_URI_PREFIX);
    STANDARD.encode_string(png, &mut uri);
    uri
}
