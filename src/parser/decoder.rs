use super::DisposalMethod;
use crate::gfx::{Color, ColorTable, Rect};

use thiserror::Error;
use log::{debug, warn};

use std::fmt;
use std::io::{self, prelude::*};
use std::mem;

const EXTENSION_INTRODUCER: u8 = 0x21;
const IMAGE_DESCRIPTOR_LABEL: u8 = 0x2c;
const TRAILER_LABEL: u8 = 0x3b;

// Extension labels
const APPLICATION_EXTENSION: u8 = 0xff;
const COMMENT_EXTENSION: u8 = 0xfe;
const GRAPHIC_CONTROL_EXTENSION: u8 = 0xf9;
const PLAIN_TEXT_EXTENSION: u8 = 0x01;

const GRAPHIC_CONTROL_BLOCK_SIZE: u8 = 4;
const APPLICATION_IDENTIFIER_LENGTH: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtensionType {
    Application,
    Comment,
    GraphicControl,
    PlainText,
    Unknown(u8),
}

impl From<u8> for ExtensionType {
    fn from(value: u8) -> Self {
        use ExtensionType::*;

        match value {
            APPLICATION_EXTENSION => Application,
            COMMENT_EXTENSION => Comment,
            GRAPHIC_CONTROL_EXTENSION => GraphicControl,
            PLAIN_TEXT_EXTENSION => PlainText,

            label => Unknown(label),
        }
    }
}

/// Per-frame rendering instructions from a Graphic Control Extension.
///
/// Frames without a preceding extension get the default: no disposal, no
/// transparency and no delay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GraphicControl {
    pub disposal_method: DisposalMethod,
    pub user_input_flag: bool,
    pub transparent_color_index: Option<u8>,

    /// Hundredths of a second.
    pub delay_time: u16,
}

/// One image of the stream, still compressed.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,

    pub interlaced: bool,

    /// The local table if the image has one, otherwise the global table.
    pub color_table: Option<ColorTable>,

    pub lzw_minimum_code_size: u8,

    /// Concatenated data sub-blocks, without the length prefixes.
    pub image_data: Box<[u8]>,

    pub control: GraphicControl,
}

impl FrameDescriptor {
    pub fn rect(&self) -> Rect {
        Rect {
            left: self.left,
            top: self.top,
            width: self.width,
            height: self.height,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn disposal_method(&self) -> DisposalMethod {
        self.control.disposal_method
    }

    pub fn transparent_color_index(&self) -> Option<u8> {
        self.control.transparent_color_index
    }
}

impl fmt::Debug for FrameDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameDescriptor")
            .field("rect", &self.rect())
            .field("interlaced", &self.interlaced)
            .field("color_table_len", &self.color_table.as_ref().map(ColorTable::len))
            .field("lzw_minimum_code_size", &self.lzw_minimum_code_size)
            .field("image_data_len", &self.image_data.len())
            .field("control", &self.control)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V87a,
    V89a,
    Other([u8; 3]),
}

impl From<[u8; 3]> for Version {
    fn from(value: [u8; 3]) -> Self {
        match &value {
            b"87a" => Version::V87a,
            b"89a" => Version::V89a,
            _ => Version::Other(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCount {
    Infinite,
    Number(u16),
}

/// Logical screen descriptor plus the stream-wide metadata found while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifHeader {
    pub version: Version,
    pub width: u16,
    pub height: u16,
    pub global_color_table: Option<ColorTable>,
    pub background_color_index: u8,
    pub pixel_aspect_ratio: u8,

    pub loop_count: Option<LoopCount>,
    pub comments: Vec<String>,
}

impl GifHeader {
    /// The background color, if the global table has an entry for it.
    pub fn background_color(&self) -> Option<Color> {
        self.global_color_table.as_ref()?.get(self.background_color_index)
    }
}

#[derive(Debug)]
enum ParserState {
    DetermineNextBlock(Option<GraphicControl>),
    ProcessExtension(ExtensionType, Option<GraphicControl>),
    ProcessImageDescriptor(Option<GraphicControl>),
    ProcessLocalColorTable(FrameDescriptor, usize),
    ProcessImageData(FrameDescriptor),
    ProcessTrailer,

    Done,
}

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("signature is invalid, expected GIF but found {0:?}")]
    InvalidSignature([u8; 3]),

    #[error("input ended before the data it declares")]
    TruncatedInput,

    #[error("failed to read GIF data")]
    Io(#[source] io::Error),
}

impl From<io::Error> for ParserError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => ParserError::TruncatedInput,
            _ => ParserError::Io(err),
        }
    }
}

/// Walks the blocks of a GIF stream and collects its frames.
#[derive(Debug)]
pub struct Decoder<R: Read> {
    inner: R,
    global_color_table: Option<ColorTable>,
    frames: Vec<FrameDescriptor>,
    comments: Vec<String>,
    loop_count: Option<LoopCount>,
}

impl<R: Read> Decoder<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            global_color_table: None,
            frames: Vec::new(),
            comments: Vec::new(),
            loop_count: None,
        }
    }

    pub fn parse(mut self) -> Result<(GifHeader, Vec<FrameDescriptor>), ParserError> {
        let mut header = self.process_header()?;
        let mut state = ParserState::DetermineNextBlock(None);

        loop {
            debug!("begin parsing state {:?}", state);

            state = self.process_next_state(state)?;
            if let ParserState::Done = state {
                break;
            }
        }

        debug!("parsed {} frames", self.frames.len());

        header.loop_count = self.loop_count;
        header.comments = mem::take(&mut self.comments);
        Ok((header, self.frames))
    }

    fn process_header(&mut self) -> Result<GifHeader, ParserError> {
        let signature = self.read_array::<3>()?;
        if &signature != b"GIF" {
            return Err(ParserError::InvalidSignature(signature));
        }

        let version = Version::from(self.read_array::<3>()?);
        debug!("processed signature, got GIF {:?}", version);

        let width = self.read_u16()?;
        let height = self.read_u16()?;

        let packed_fields = self.read_byte()?;

        // packed field start
        let global_color_table_flag = packed_fields & 0b10000000 != 0;
        let global_color_table_len = color_table_len(packed_fields);
        // packed field end

        let background_color_index = self.read_byte()?;
        let pixel_aspect_ratio = self.read_byte()?;

        if global_color_table_flag {
            self.global_color_table = Some(self.read_color_table(global_color_table_len)?);
        }

        let header = GifHeader {
            version,
            width,
            height,
            global_color_table: self.global_color_table.clone(),
            background_color_index,
            pixel_aspect_ratio,
            loop_count: None,
            comments: Vec::new(),
        };
        debug!("processed logical screen descriptor, got: {:?}", header);

        Ok(header)
    }

    fn process_next_state(&mut self, next_state: ParserState) -> Result<ParserState, ParserError> {
        use ParserState::*;

        match next_state {
            DetermineNextBlock(graphic_control) => {
                let introducer_or_label = self.read_byte()?;

                match introducer_or_label {
                    // extension introducer means that a label follows determining what exact type
                    // of extension it is.
                    EXTENSION_INTRODUCER => {
                        let label = ExtensionType::from(self.read_byte()?);
                        Ok(ProcessExtension(label, graphic_control))
                    },
                    IMAGE_DESCRIPTOR_LABEL => Ok(ProcessImageDescriptor(graphic_control)),
                    TRAILER_LABEL => Ok(ProcessTrailer),
                    label => {
                        warn!("skipping unexpected byte 0x{label:02x} between blocks");
                        Ok(DetermineNextBlock(graphic_control))
                    }
                }
            },
            ProcessExtension(label, graphic_control) => self.process_extension(label, graphic_control),
            ProcessImageDescriptor(graphic_control) => {
                let left = self.read_u16()?;
                let top = self.read_u16()?;

                let width = self.read_u16()?;
                let height = self.read_u16()?;

                let packed_fields = self.read_byte()?;

                let local_color_table_flag = packed_fields & 0b10000000 != 0;
                let interlaced = packed_fields & 0b01000000 != 0;

                let frame = FrameDescriptor {
                    left,
                    top,
                    width,
                    height,
                    interlaced,
                    color_table: self.global_color_table.clone(),
                    lzw_minimum_code_size: 0,
                    image_data: Box::default(),
                    control: graphic_control.unwrap_or_default(),
                };

                let next_state = if local_color_table_flag {
                    ProcessLocalColorTable(frame, color_table_len(packed_fields))
                } else {
                    ProcessImageData(frame)
                };

                Ok(next_state)
            },
            ProcessLocalColorTable(mut frame, len) => {
                frame.color_table = Some(self.read_color_table(len)?);

                Ok(ProcessImageData(frame))
            },
            ProcessImageData(mut frame) => {
                frame.lzw_minimum_code_size = self.read_byte()?;
                frame.image_data = self.read_data_sub_blocks()?;

                debug!("processed image, got: {:?}", frame);
                self.frames.push(frame);

                Ok(DetermineNextBlock(None))
            },
            ProcessTrailer | Done => Ok(Done),
        }
    }

    fn process_extension(
        &mut self,
        label: ExtensionType,
        graphic_control: Option<GraphicControl>,
    ) -> Result<ParserState, ParserError> {
        use ExtensionType::*;

        debug!("processing extension type: {:?}", label);
        match label {
            GraphicControl => {
                if graphic_control.is_some() {
                    debug!("graphic control extension replaces one that no image used");
                }
                let graphic_control = self.read_graphic_control()?;
                debug!("processed GraphicControlExtension: {:?}", graphic_control);

                Ok(ParserState::DetermineNextBlock(Some(graphic_control)))
            },
            Application => {
                // identifier and authentication code arrive as the first sub-block
                let application_data = self.read_data_sub_blocks()?;

                if let Some(loop_count) = parse_loop_count(&application_data) {
                    debug!("processed looping extension, got: {:?}", loop_count);
                    self.loop_count = Some(loop_count);
                }
                Ok(ParserState::DetermineNextBlock(graphic_control))
            },
            Comment => {
                let data = self.read_data_sub_blocks()?;
                let comment = String::from_utf8_lossy(&data).into_owned();
                debug!("processed comment block, got: {}", comment);

                self.comments.push(comment);
                Ok(ParserState::DetermineNextBlock(graphic_control))
            },
            PlainText | Unknown(_) => {
                self.skip_data_sub_blocks()?;
                Ok(ParserState::DetermineNextBlock(graphic_control))
            },
        }
    }

    fn read_graphic_control(&mut self) -> Result<GraphicControl, ParserError> {
        let block_size = self.read_byte()?;
        if block_size != GRAPHIC_CONTROL_BLOCK_SIZE {
            warn!("graphic control extension declares {block_size} bytes instead of 4, using defaults");
            self.read_bytes(block_size.into())?;
            self.read_byte()?;
            return Ok(GraphicControl::default());
        }

        let packed_fields = self.read_byte()?;
        // packed fields definition
        // XXXYYYZW
        // XXX = reserved, not needed
        // YYY = disposal method, indicates what to do with graphic after displaying
        // Z = user input flag
        // W = transparent color flag

        let disposal_bits = (packed_fields >> 2) & 0b00000111;
        let disposal_method = DisposalMethod::from_u8(disposal_bits).unwrap_or_else(|| {
            debug!("reserved disposal method {disposal_bits}, treating it as unspecified");
            DisposalMethod::Unspecified
        });
        let user_input_flag = packed_fields & 0b00000010 != 0;
        let transparent_color_flag = packed_fields & 0b00000001 != 0;

        let delay_time = self.read_u16()?;
        // present in every 4-byte block, only meaningful when the flag is set
        let transparent_color_index = self.read_byte()?;

        let block_terminator = self.read_byte()?;
        if block_terminator != 0 {
            warn!("graphic control extension ends with 0x{block_terminator:02x} instead of a terminator");
        }

        Ok(GraphicControl {
            disposal_method,
            user_input_flag,
            transparent_color_index: transparent_color_flag.then_some(transparent_color_index),
            delay_time,
        })
    }

    fn read_color_table(&mut self, len: usize) -> Result<ColorTable, ParserError> {
        let bytes = self.read_bytes(3 * len)?;
        Ok(ColorTable::from_rgb_bytes(&bytes))
    }

    fn read_bytes(&mut self, count: usize) -> Result<Box<[u8]>, ParserError> {
        let mut buffer = vec![0; count];
        self.inner.read_exact(&mut buffer)?;
        Ok(buffer.into_boxed_slice())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ParserError> {
        let mut buffer = [0; N];
        self.inner.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn read_byte(&mut self) -> Result<u8, ParserError> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    fn read_u16(&mut self) -> Result<u16, ParserError> {
        // GIF89a: Unless otherwise stated, multi-byte numeric fields are ordered with the Least
        // Significant Byte first.
        Ok(u16::from_le_bytes(self.read_array::<2>()?))
    }

    fn read_data_sub_blocks(&mut self) -> Result<Box<[u8]>, ParserError> {
        let mut block_size = self.read_byte()?;

        // there could be more than one block, but we do know we'll at least have 1 sub-block.
        // allocate capacity to account for it.
        let mut result = Vec::with_capacity(block_size.into());

        // we might have read the block terminator at the end of the while loop, stop right there
        // because we're done.
        while block_size != 0 {
            let start = result.len();
            result.resize(start + block_size as usize, 0);
            self.inner.read_exact(&mut result[start..])?;

            block_size = self.read_byte()?;
        }

        Ok(result.into_boxed_slice())
    }

    fn skip_data_sub_blocks(&mut self) -> Result<(), ParserError> {
        let mut block_size = self.read_byte()?;
        while block_size != 0 {
            self.read_bytes(block_size.into())?;
            block_size = self.read_byte()?;
        }
        Ok(())
    }
}

/// Entry count encoded in the low three bits of a packed field.
fn color_table_len(packed_fields: u8) -> usize {
    2 << (packed_fields & 0b00000111)
}

fn parse_loop_count(application_data: &[u8]) -> Option<LoopCount> {
    if application_data.len() < APPLICATION_IDENTIFIER_LENGTH {
        return None;
    }
    let (identifier, data) = application_data.split_at(APPLICATION_IDENTIFIER_LENGTH);

    if identifier != b"NETSCAPE2.0" && identifier != b"ANIMEXTS1.0" {
        return None;
    }

    match data {
        [1, low, high, ..] => Some(match u16::from_le_bytes([*low, *high]) {
            0 => LoopCount::Infinite,
            number => LoopCount::Number(number),
        }),
        _ => None,
    }
}
