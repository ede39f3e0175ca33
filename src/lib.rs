//! GIF decoding and compositing, with PNG output for individual frames.
//!
//! ```no_run
//! let file = std::fs::File::open("animation.gif")?;
//! let mut animation = gif2png::decode(std::io::BufReader::new(file))?;
//!
//! if let Some(canvas) = animation.get_frame(0) {
//!     let png = gif2png::encode_png(canvas.width() as u32, canvas.height() as u32, &canvas)?;
//!     std::fs::write("frame_0.png", png)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod export;
pub mod gfx;
pub mod parser;
pub mod png_writer;

use std::io::Read;

pub use export::{encode_frame, export_frames, to_data_uri, ExportOptions, FrameBatch, Progress};
pub use gfx::{Animation, Canvas, Color, ColorTable, DecodeOptions, GifInfo};
pub use parser::{DisposalMethod, FrameDescriptor, GifHeader, ParserError};
pub use png_writer::{crc32, encode_png, write_png, EncodeError};

/// Parses a GIF stream into an [`Animation`] with default options.
pub fn decode<R: Read>(reader: R) -> Result<Animation, ParserError> {
    decode_with_options(reader, DecodeOptions::default())
}

pub fn decode_with_options<R: Read>(reader: R, options: DecodeOptions) -> Result<Animation, ParserError> {
    let (header, frames) = parser::parse(reader)?;
    Ok(Animation::with_options(header, frames, options))
}
