use crate::gfx::Canvas;

use crc32fast::Hasher;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::debug;
use thiserror::Error;

use std::io::{self, prelude::*};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

const BIT_DEPTH: u8 = 8;
const COLOR_TYPE_TRUECOLOR: u8 = 2;
const FILTER_NONE: u8 = 0;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("image is {width}x{height} but the canvas is {canvas_width}x{canvas_height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        canvas_width: usize,
        canvas_height: usize,
    },

    #[error("failed to write PNG data")]
    Io(#[from] io::Error),
}

/// CRC-32 as used by PNG chunks (ISO 3309).
pub fn crc32(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

fn write_chunk<W: Write>(writer: &mut W, kind: &[u8; 4], data: &[u8]) -> io::Result<()> {
    let len = u32::try_from(data.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "chunk too large for PNG"))?;
    let mut hasher = Hasher::new();
    hasher.update(kind);
    hasher.update(data);
    let crc = hasher.finalize();

    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(kind)?;
    writer.write_all(data)?;
    writer.write_all(&crc.to_be_bytes())?;
    Ok(())
}

/// Encodes `canvas` as an 8-bit RGB PNG of `width` x `height` pixels.
pub fn encode_png(width: u32, height: u32, canvas: &Canvas) -> Result<Vec<u8>, EncodeError> {
    if width as usize != canvas.width() || height as usize != canvas.height() {
        return Err(EncodeError::DimensionMismatch {
            width,
            height,
            canvas_width: canvas.width(),
            canvas_height: canvas.height(),
        });
    }

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    // bit depth, color type, compression, filter, interlace
    ihdr.extend_from_slice(&[BIT_DEPTH, COLOR_TYPE_TRUECOLOR, 0, 0, 0]);

    let mut scanlines = Vec::with_capacity(canvas.height() * (1 + canvas.width() * 3));
    if canvas.width() > 0 {
        for row in canvas.rows() {
            scanlines.push(FILTER_NONE);
            scanlines.extend(row.iter().flat_map(|color| [color.r, color.g, color.b]));
        }
    } else {
        scanlines.resize(canvas.height(), FILTER_NONE);
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&scanlines)?;
    let idat = encoder.finish()?;

    debug!("encoded {width}x{height} PNG, {} byte IDAT", idat.len());

    let mut png = Vec::with_capacity(PNG_SIGNATURE.len() + idat.len() + 3 * 12 + ihdr.len());
    png.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr)?;
    write_chunk(&mut png, b"IDAT", &idat)?;
    write_chunk(&mut png, b"IEND", &[])?;
    Ok(png)
}

/// Writes `canvas` to `writer` as a PNG of the canvas's own size.
pub fn write_png<W: Write>(mut writer: W, canvas: &Canvas) -> Result<(), EncodeError> {
    let too_large = |_| io::Error::new(io::ErrorKind::InvalidInput, "canvas too large for PNG");
    let width = u32::try_from(canvas.width()).map_err(too_large)?;
    let height = u32::try_from(canvas.height()).map_err(too_large)?;

    let png = encode_png(width, height, canvas)?;
    writer.write_all(&png)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::Color;

    use flate2::read::ZlibDecoder;
    use std::io::Read;

    /// (type, data) of every chunk after the signature.
    fn chunks(png: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut rest = &png[8..];
        let mut chunks = Vec::new();
        while !rest.is_empty() {
            let len = u32::from_be_bytes(rest[..4].try_into().unwrap()) as usize;
            let kind = String::from_utf8(rest[4..8].to_vec()).unwrap();
            let data = rest[8..8 + len].to_vec();
            let crc = u32::from_be_bytes(rest[8 + len..12 + len].try_into().unwrap());
            assert_eq!(crc, crc32(&rest[4..8 + len]), "crc of {kind}");

            chunks.push((kind, data));
            rest = &rest[12 + len..];
        }
        chunks
    }

    #[test]
    fn known_crc_values() {
        assert_eq!(crc32(b""), 0);
        assert_eq!(crc32(b"IEND"), 0xae426082);
        assert_eq!(crc32(b"123456789"), 0xcbf43926);
    }

    #[test]
    fn single_pixel_png() {
        let canvas = Canvas::new(1, 1, Color::new(10, 20, 30));
        let png = encode_png(1, 1, &canvas).unwrap();

        assert_eq!(&png[..8], &PNG_SIGNATURE);
        // IEND is always the same 12 bytes
        assert_eq!(&png[png.len() - 12..], &[0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xae, 0x42, 0x60, 0x82]);

        let chunks = chunks(&png);
        let kinds: Vec<&str> = chunks.iter().map(|(kind, _)| kind.as_str()).collect();
        assert_eq!(kinds, vec!["IHDR", "IDAT", "IEND"]);
        assert_eq!(chunks[0].1, vec![0, 0, 0, 1, 0, 0, 0, 1, 8, 2, 0, 0, 0]);

        let mut scanlines = Vec::new();
        ZlibDecoder::new(chunks[1].1.as_slice()).read_to_end(&mut scanlines).unwrap();
        assert_eq!(scanlines, vec![0, 10, 20, 30]);
    }

    #[test]
    fn every_row_starts_with_filter_byte() {
        let mut canvas = Canvas::new(2, 2, Color::BLACK);
        canvas.set_pixel(1, 1, Color::new(1, 2, 3));
        let png = encode_png(2, 2, &canvas).unwrap();

        let mut scanlines = Vec::new();
        ZlibDecoder::new(chunks(&png)[1].1.as_slice()).read_to_end(&mut scanlines).unwrap();
        assert_eq!(scanlines, vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3]);
    }

    #[test]
    fn dimensions_must_match_canvas() {
        let canvas = Canvas::new(3, 2, Color::BLACK);
        match encode_png(2, 3, &canvas) {
            Err(EncodeError::DimensionMismatch { canvas_width: 3, canvas_height: 2, .. }) => {},
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn write_png_uses_canvas_size() {
        let canvas = Canvas::new(4, 3, Color::new(200, 100, 50));
        let mut out = Vec::new();
        write_png(&mut out, &canvas).unwrap();
        assert_eq!(out, encode_png(4, 3, &canvas).unwrap());
    }
}
