#![allow(dead_code)]

use std::collections::HashMap;

use gif2png::gfx::interlaced_row_order;

/// LSB-first code packer.
struct BitWriter {
    bytes: Vec<u8>,
    acc: u32,
    bits: u32,
}

impl BitWriter {
    fn write(&mut self, code: u16, size: u32) {
        self.acc |= u32::from(code) << self.bits;
        self.bits += size;
        while self.bits >= 8 {
            self.bytes.push(self.acc as u8);
            self.acc >>= 8;
            self.bits -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.bytes.push(self.acc as u8);
        }
        self.bytes
    }
}

struct Encoder {
    writer: BitWriter,
    minimum_code_size: u8,
    code_size: u32,
    next_code: u16,
    dictionary: HashMap<(u16, u8), u16>,
    // codes written since the last clear
    emitted: usize,
}

impl Encoder {
    fn clear_code(&self) -> u16 {
        1 << self.minimum_code_size
    }

    fn clear(&mut self) {
        self.writer.write(self.clear_code(), self.code_size);
        self.code_size = u32::from(self.minimum_code_size) + 1;
        self.next_code = self.clear_code() + 2;
        self.dictionary.clear();
        self.emitted = 0;
    }

    fn maybe_grow(&mut self) {
        if self.emitted >= 2 && u32::from(self.next_code) > (1 << self.code_size) && self.code_size < 12 {
            self.code_size += 1;
        }
    }

    fn emit(&mut self, prefix: u16, next: u8) {
        self.writer.write(prefix, self.code_size);
        self.emitted += 1;
        if self.next_code < 4096 {
            self.dictionary.insert((prefix, next), self.next_code);
            self.next_code += 1;
            self.maybe_grow();
        }
    }

    /// Writes the pending prefix, tracking the entry a decoder adds for it.
    fn flush(&mut self, prefix: u16) {
        self.writer.write(prefix, self.code_size);
        self.emitted += 1;
        if self.emitted >= 2 && self.next_code < 4096 {
            self.next_code += 1;
            self.maybe_grow();
        }
    }
}

/// LZW-compresses color indices the way a GIF encoder would.
///
/// With `clear_every` a clear code is inserted after that many indices, so the
/// dictionary is rebuilt several times within one stream. `minimum_code_size`
/// must be at least 2.
pub fn lzw_encode(indices: &[u8], minimum_code_size: u8, clear_every: Option<usize>) -> Vec<u8> {
    let mut encoder = Encoder {
        writer: BitWriter { bytes: Vec::new(), acc: 0, bits: 0 },
        minimum_code_size,
        code_size: u32::from(minimum_code_size) + 1,
        next_code: (1 << minimum_code_size) + 2,
        dictionary: HashMap::new(),
        emitted: 0,
    };
    encoder.clear();

    let mut prefix: Option<u16> = None;
    let mut since_clear = 0;
    for &index in indices {
        if clear_every == Some(since_clear) {
            if let Some(pending) = prefix.take() {
                encoder.flush(pending);
            }
            encoder.clear();
            since_clear = 0;
        }
        since_clear += 1;

        let Some(current) = prefix else {
            prefix = Some(u16::from(index));
            continue;
        };

        if let Some(&code) = encoder.dictionary.get(&(current, index)) {
            prefix = Some(code);
            continue;
        }

        encoder.emit(current, index);
        prefix = Some(u16::from(index));
    }

    if let Some(pending) = prefix {
        encoder.flush(pending);
    }
    let end_code = encoder.clear_code() + 1;
    let code_size = encoder.code_size;
    encoder.writer.write(end_code, code_size);
    encoder.writer.finish()
}

#[derive(Debug, Clone)]
pub struct TestFrame {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    /// Row-major color indices, `width * height` of them.
    pub indices: Vec<u8>,
    pub local_table: Option<Vec<[u8; 3]>>,
    pub interlaced: bool,
    pub disposal: u8,
    pub transparent: Option<u8>,
}

impl TestFrame {
    pub fn new(left: u16, top: u16, width: u16, height: u16, indices: Vec<u8>) -> Self {
        assert_eq!(indices.len(), width as usize * height as usize);
        Self {
            left,
            top,
            width,
            height,
            indices,
            local_table: None,
            interlaced: false,
            disposal: 0,
            transparent: None,
        }
    }

    pub fn disposal(mut self, disposal: u8) -> Self {
        self.disposal = disposal;
        self
    }

    pub fn transparent(mut self, index: u8) -> Self {
        self.transparent = Some(index);
        self
    }

    pub fn interlaced(mut self) -> Self {
        self.interlaced = true;
        self
    }

    pub fn local_table(mut self, colors: Vec<[u8; 3]>) -> Self {
        self.local_table = Some(colors);
        self
    }
}

/// Assembles GIF89a files byte by byte.
#[derive(Debug, Clone)]
pub struct GifBuilder {
    pub width: u16,
    pub height: u16,
    pub global_table: Option<Vec<[u8; 3]>>,
    pub background_index: u8,
    pub frames: Vec<TestFrame>,
}

impl GifBuilder {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            global_table: None,
            background_index: 0,
            frames: Vec::new(),
        }
    }

    pub fn global_table(mut self, colors: Vec<[u8; 3]>) -> Self {
        self.global_table = Some(colors);
        self
    }

    pub fn background(mut self, index: u8) -> Self {
        self.background_index = index;
        self
    }

    pub fn frame(mut self, frame: TestFrame) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = b"GIF89a".to_vec();
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());

        let global_bits = self.global_table.as_ref().map(|table| table_size_bits(table.len()));
        out.push(global_bits.map_or(0, |bits| 0x80 | bits));
        out.push(self.background_index);
        out.push(0);
        if let (Some(table), Some(bits)) = (&self.global_table, global_bits) {
            write_table(&mut out, table, bits);
        }

        for frame in &self.frames {
            out.extend_from_slice(&[0x21, 0xf9, 4]);
            out.push((frame.disposal << 2) | u8::from(frame.transparent.is_some()));
            out.extend_from_slice(&[0, 0]);
            out.push(frame.transparent.unwrap_or(0));
            out.push(0);

            out.push(0x2c);
            for value in [frame.left, frame.top, frame.width, frame.height] {
                out.extend_from_slice(&value.to_le_bytes());
            }

            let local_bits = frame.local_table.as_ref().map(|table| table_size_bits(table.len()));
            let mut packed = local_bits.map_or(0, |bits| 0x80 | bits);
            if frame.interlaced {
                packed |= 0x40;
            }
            out.push(packed);
            if let (Some(table), Some(bits)) = (&frame.local_table, local_bits) {
                write_table(&mut out, table, bits);
            }

            let palette_len = frame
                .local_table
                .as_ref()
                .or(self.global_table.as_ref())
                .map_or(2, Vec::len);
            let minimum_code_size = minimum_code_size(palette_len);

            let transmitted = if frame.interlaced {
                interlace(&frame.indices, frame.width as usize, frame.height as usize)
            } else {
                frame.indices.clone()
            };

            out.push(minimum_code_size);
            write_sub_blocks(&mut out, &lzw_encode(&transmitted, minimum_code_size, None));
        }

        out.push(0x3b);
        out
    }
}

/// Rows in transmission order, the inverse of deinterlacing.
pub fn interlace(indices: &[u8], width: usize, height: usize) -> Vec<u8> {
    interlaced_row_order(height)
        .flat_map(|row| indices[row * width..(row + 1) * width].iter().copied())
        .collect()
}

pub fn write_sub_blocks(out: &mut Vec<u8>, data: &[u8]) {
    for block in data.chunks(255) {
        out.push(block.len() as u8);
        out.extend_from_slice(block);
    }
    out.push(0);
}

/// Smallest `n` with `2 << n >= len`.
fn table_size_bits(len: usize) -> u8 {
    (0..8).find(|&bits| 2usize << bits >= len).unwrap_or(7)
}

fn write_table(out: &mut Vec<u8>, colors: &[[u8; 3]], bits: u8) {
    for i in 0..(2usize << bits) {
        out.extend_from_slice(colors.get(i).unwrap_or(&[0, 0, 0]));
    }
}

fn minimum_code_size(palette_len: usize) -> u8 {
    (2..=8).find(|&bits| 1usize << bits >= palette_len).unwrap_or(8)
}
