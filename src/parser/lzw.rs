use super::bit_reader::BitReader;

use log::{trace, warn};
use thiserror::Error;

const MAX_CODE_SIZE: u32 = 12;
const MAX_TABLE_SIZE: usize = 1 << MAX_CODE_SIZE;
// color indices are a byte wide, so literal codes must fit in one
const MAX_MINIMUM_CODE_SIZE: u8 = 8;
const NO_PREFIX: u16 = u16::MAX;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptCompression {
    #[error("minimum code size {0} is out of range")]
    UnsupportedCodeSize(u8),

    #[error("code {code} is past the end of a dictionary holding {table_size} entries")]
    InvalidCode {
        code: u16,
        table_size: usize,
    },

    #[error("code {0} has no preceding code to extend")]
    MissingPrefix(u16),
}

#[derive(Debug)]
pub struct Decompressed {
    pub indices: Vec<u8>,
    pub corruption: Option<CorruptCompression>,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    prefix: u16,
    suffix: u8,
    first: u8,
    length: u16,
}

struct CodeTable {
    entries: Vec<Entry>,
    clear_code: u16,
}

impl CodeTable {
    fn new(minimum_code_size: u8) -> Self {
        let mut table = Self {
            entries: Vec::with_capacity(MAX_TABLE_SIZE),
            clear_code: 1 << minimum_code_size,
        };
        table.reset();
        table
    }

    fn reset(&mut self) {
        self.entries.clear();
        self.entries.extend((0..self.clear_code).map(|i| Entry {
            prefix: NO_PREFIX,
            suffix: i as u8,
            first: i as u8,
            length: 1,
        }));

        // clear and end-of-information occupy two slots but never expand to indices
        let reserved = Entry { prefix: NO_PREFIX, suffix: 0, first: 0, length: 0 };
        self.entries.extend([reserved, reserved]);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn first(&self, code: u16) -> u8 {
        self.entries[code as usize].first
    }

    fn push(&mut self, prefix: u16, suffix: u8) {
        let parent = self.entries[prefix as usize];
        self.entries.push(Entry {
            prefix,
            suffix,
            first: parent.first,
            length: parent.length + 1,
        });
    }

    fn emit(&self, code: u16, indices: &mut Vec<u8>) {
        let start = indices.len();
        indices.resize(start + self.entries[code as usize].length as usize, 0);

        let mut code = code;
        for slot in indices[start..].iter_mut().rev() {
            let entry = self.entries[code as usize];
            *slot = entry.suffix;
            code = entry.prefix;
        }
    }
}

/// Decodes a GIF image data stream into color table indices.
///
/// The result always holds exactly `pixel_count` indices: extra output is cut off and a
/// short or corrupt stream is padded by repeating the last decoded index (zero when
/// nothing was decoded).
pub fn lzw_decode(buf: &[u8], minimum_code_size: u8, pixel_count: usize) -> Vec<u8> {
    let Decompressed { mut indices, corruption } = decompress(buf, minimum_code_size, pixel_count);

    if let Some(err) = corruption {
        warn!("corrupt LZW stream after {} of {pixel_count} indices: {err}", indices.len());
    }

    fit_to_pixel_count(&mut indices, pixel_count);
    indices
}

/// Stops at the end code, the end of the data, `pixel_count` indices or the first bad code.
pub fn decompress(buf: &[u8], minimum_code_size: u8, pixel_count: usize) -> Decompressed {
    // capacity follows the data, not the declared frame size
    let mut indices = Vec::with_capacity(pixel_count.min(buf.len().saturating_mul(MAX_TABLE_SIZE)));

    if minimum_code_size > MAX_MINIMUM_CODE_SIZE {
        return Decompressed {
            indices,
            corruption: Some(CorruptCompression::UnsupportedCodeSize(minimum_code_size)),
        };
    }

    let clear_code: u16 = 1 << minimum_code_size;
    let end_of_information_code = clear_code + 1;
    trace!("clear_code={clear_code} end_of_information_code={end_of_information_code}");

    let mut table = CodeTable::new(minimum_code_size);
    let mut reader = BitReader::new(buf);
    let mut code_size = u32::from(minimum_code_size) + 1;
    let mut last_code: Option<u16> = None;

    while indices.len() < pixel_count {
        let Some(code) = reader.next(code_size) else {
            trace!("ran out of data with {} bits left over", reader.remaining());
            break;
        };

        if code == clear_code {
            table.reset();
            code_size = u32::from(minimum_code_size) + 1;
            last_code = None;
            continue;
        }

        if code == end_of_information_code {
            break;
        }

        let Some(previous) = last_code else {
            // the first code after a clear has nothing to extend, so it must be a literal
            if code > clear_code {
                return Decompressed {
                    indices,
                    corruption: Some(CorruptCompression::MissingPrefix(code)),
                };
            }
            table.emit(code, &mut indices);
            last_code = Some(code);
            continue;
        };

        let table_size = table.len();
        let first_index = if (code as usize) < table_size {
            // output {CODE}, K is its first index
            table.emit(code, &mut indices);
            table.first(code)
        } else if code as usize == table_size {
            // {CODE-1}+K where K is the first index of {CODE-1}
            let first_index = table.first(previous);
            table.emit(previous, &mut indices);
            indices.push(first_index);
            first_index
        } else {
            return Decompressed {
                indices,
                corruption: Some(CorruptCompression::InvalidCode { code, table_size }),
            };
        };

        // a full table stays frozen until the next clear code
        if table_size < MAX_TABLE_SIZE {
            table.push(previous, first_index);
            if table.len() > (1 << code_size) - 1 && code_size < MAX_CODE_SIZE {
                code_size += 1;
            }
        }

        last_code = Some(code);
    }

    Decompressed { indices, corruption: None }
}

fn fit_to_pixel_count(indices: &mut Vec<u8>, pixel_count: usize) {
    if indices.len() > pixel_count {
        indices.truncate(pixel_count);
    } else {
        let fill = indices.last().copied().unwrap_or(0);
        indices.resize(pixel_count, fill);
    }
}
