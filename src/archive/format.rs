//! Save container layout
//!
//! ```text
//! [header chunk .. "None" "None" signature .. 4 unknown bytes]
//! [i32 compressed_size][i32 main][i32 backup1][i32 backup2]
//! [deflate stream: main ++ backup1 ++ backup2]
//! ```
//!
//! All integers are little-endian. The signature may occur more than once;
//! the last occurrence marks the boundary.

use flate2::read::DeflateDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::ArchiveError;

/// Two length-prefixed "None" name markers.
pub const SIGNATURE: [u8; 19] = [
    0x00, 0x05, 0x00, 0x00, 0x00, b'N', b'o', b'n', b'e', //
    0x00, 0x05, 0x00, 0x00, 0x00, b'N', b'o', b'n', b'e', 0x00,
];
/// Unknown bytes between the signature and the size fields.
pub const SIGNATURE_SKIP: usize = 4;
const SIZE_FIELDS_LEN: usize = 16;

/// The three database segments, in container order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Main,
    Backup1,
    Backup2,
}

impl SegmentKind {
    pub const ALL: [SegmentKind; 3] = [SegmentKind::Main, SegmentKind::Backup1, SegmentKind::Backup2];

    pub fn file_name(self) -> &'static str {
        match self {
            SegmentKind::Main => "main.db",
            SegmentKind::Backup1 => "backup1.db",
            SegmentKind::Backup2 => "backup2.db",
        }
    }

    fn field(self) -> &'static str {
        match self {
            SegmentKind::Main => "main segment size",
            SegmentKind::Backup1 => "backup1 segment size",
            SegmentKind::Backup2 => "backup2 segment size",
        }
    }
}

/// Size fields that follow the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Offset of the first size field; everything before it is the header chunk
    pub boundary: usize,
    /// Informational only
    pub compressed_size: i32,
    pub sizes: [i32; 3],
}

impl ContainerHeader {
    pub fn payload_offset(&self) -> usize {
        self.boundary + SIZE_FIELDS_LEN
    }

    /// Sum of the positive declared sizes.
    pub fn expected_len(&self) -> usize {
        self.sizes.iter().filter(|size| **size > 0).map(|size| *size as usize).sum()
    }
}

/// One extracted database segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub data: Vec<u8>,
}

/// Everything pulled out of one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContainer {
    pub header: ContainerHeader,
    pub header_chunk: Vec<u8>,
    pub segments: Vec<Segment>,
}

/// Locate the header/data boundary: last signature end plus the skip bytes.
pub fn find_boundary(bytes: &[u8]) -> Result<usize, ArchiveError> {
    let start = bytes
        .windows(SIGNATURE.len())
        .rposition(|window| window == SIGNATURE)
        .ok_or(ArchiveError::SignatureNotFound)?;
    Ok(start + SIGNATURE.len() + SIGNATURE_SKIP)
}

fn read_i32(bytes: &[u8], offset: usize, field: &'static str) -> Result<i32, ArchiveError> {
    bytes
        .get(offset..offset + 4)
        .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(ArchiveError::Truncated { field, offset })
}

pub fn read_header(bytes: &[u8]) -> Result<ContainerHeader, ArchiveError> {
    let boundary = find_boundary(bytes)?;
    if boundary > bytes.len() {
        return Err(ArchiveError::Truncated { field: "signature padding", offset: bytes.len() });
    }

    let compressed_size = read_i32(bytes, boundary, "compressed size")?;
    let mut sizes = [0i32; 3];
    for (i, kind) in SegmentKind::ALL.iter().enumerate() {
        sizes[i] = read_i32(bytes, boundary + 4 + i * 4, kind.field())?;
    }

    Ok(ContainerHeader { boundary, compressed_size, sizes })
}

fn inflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    DeflateDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

/// Inflate the segment block.
///
/// The block normally carries a 2-byte zlib header, so the first attempt skips
/// it. When that fails, or yields fewer bytes than the sizes declare, the whole
/// block is tried as a raw deflate stream.
pub fn decompress(data: &[u8], expected_len: usize) -> Result<Vec<u8>, ArchiveError> {
    let skipped = match data.get(2..) {
        Some(rest) => inflate(rest),
        None => Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "block shorter than zlib header")),
    };

    match skipped {
        Ok(out) if out.len() >= expected_len => Ok(out),
        first => match (first, inflate(data)) {
            (Ok(short), Ok(full)) => Ok(if full.len() > short.len() { full } else { short }),
            (Ok(short), Err(_)) => Ok(short),
            (Err(_), Ok(full)) => Ok(full),
            (Err(with_skip), Err(without_skip)) => Err(ArchiveError::Decompression {
                with_header_skip: with_skip.to_string(),
                without_header_skip: without_skip.to_string(),
            }),
        },
    }
}

/// Cut the inflated block into segments, skipping non-positive sizes.
pub fn split_segments(buf: &[u8], sizes: [i32; 3]) -> Result<Vec<Segment>, ArchiveError> {
    let mut segments = Vec::with_capacity(3);
    let mut position = 0usize;

    for (kind, declared) in SegmentKind::ALL.into_iter().zip(sizes) {
        if declared <= 0 {
            continue;
        }
        let declared = declared as usize;
        let available = buf.len() - position;
        if declared > available {
            return Err(ArchiveError::SegmentOverrun { segment: kind.file_name(), declared, available });
        }
        segments.push(Segment { kind, data: buf[position..position + declared].to_vec() });
        position += declared;
    }

    Ok(segments)
}

/// Parse a complete container.
pub fn parse_container(bytes: &[u8]) -> Result<ParsedContainer, ArchiveError> {
    let header = read_header(bytes)?;
    let block = &bytes[header.payload_offset()..];
    let inflated = decompress(block, header.expected_len())?;
    let segments = split_segments(&inflated, header.sizes)?;

    Ok(ParsedContainer { header, header_chunk: bytes[..header.boundary].to_vec(), segments })
}

/// Build a container around `header_chunk`, which must end with the signature
/// and the skip bytes. Segments are zlib-compressed as the game writes them.
pub fn write_container(header_chunk: &[u8], segments: [&[u8]; 3]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    for segment in segments {
        encoder.write_all(segment)?;
    }
    let block = encoder.finish()?;

    let size = |len: usize| {
        i32::try_from(len).map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "segment exceeds i32"))
    };

    let mut out = Vec::with_capacity(header_chunk.len() + SIZE_FIELDS_LEN + block.len());
    out.extend_from_slice(header_chunk);
    out.extend_from_slice(&size(block.len())?.to_le_bytes());
    for segment in segments {
        out.extend_from_slice(&size(segment.len())?.to_le_bytes());
    }
    out.extend_from_slice(&block);
    Ok(out)
}
