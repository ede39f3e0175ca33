mod decoder;
mod bit_reader;
mod lzw;

use std::io::Read;

pub use decoder::{Decoder, FrameDescriptor, GifHeader, GraphicControl, LoopCount, ParserError, Version};
pub use lzw::{decompress, lzw_decode, CorruptCompression, Decompressed};

/// Parses a whole GIF stream into its header and ordered frame list.
pub fn parse<R: Read>(reader: R) -> Result<(GifHeader, Vec<FrameDescriptor>), ParserError> {
    Decoder::new(reader).parse()
}

#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DisposalMethod {
    #[default]
    Unspecified = 0,
    DoNotDispose = 1,
    RestoreToBackgroundColor = 2,
    RestoreToPrevious = 3,
}

impl DisposalMethod {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DisposalMethod::Unspecified),
            1 => Some(DisposalMethod::DoNotDispose),
            2 => Some(DisposalMethod::RestoreToBackgroundColor),
            3 => Some(DisposalMethod::RestoreToPrevious),
            _ => None,
        }
    }
}
