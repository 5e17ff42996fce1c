use crc::{CRC_32_MPEG_2, Crc};
use serde::Serialize;
use thiserror::Error;

use super::config::{DecodeConfig, Revision};
use super::embedded::{EmbeddedDecoder, NoEmbeddedDecoder};
use super::error::TableError;
use super::field::Field;
use super::header::{TableHeader, decode_header};
use super::layout::{self, TableKind};
use super::reader::TableReader;
use super::tables::{TableBody, decode_body};

const SECTION_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// CRC32 trailer of an RCS section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionCrc {
    pub value: u32,
    /// CRC-32/MPEG-2 over every section byte before the trailer.
    pub computed: u32,
    pub offset: usize,
}

impl SectionCrc {
    pub fn is_valid(&self) -> bool {
        self.value == self.computed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeResult {
    pub header: TableHeader,
    /// `None` for table ids without a decoder.
    pub body: Option<TableBody>,
    pub crc: Option<SectionCrc>,
    /// RCS: section bytes after the header, as declared by `section_length`.
    /// RCS2: every byte the decoder read.
    pub bytes_consumed: usize,
    /// Offset one past the last byte read.
    pub end_offset: usize,
    pub fields: Vec<Field>,
}

/// Decoding stopped early. `fields` holds everything decoded before `offset`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("table decode failed: {error}")]
pub struct DecodeFailure {
    pub error: TableError,
    pub offset: usize,
    pub fields: Vec<Field>,
}

/// Decode one signalling table from `buffer`.
///
/// # Examples
/// ```
/// use rcsshark_core::{DecodeConfig, Revision, decode_table};
///
/// // RCS2 time and date table: id, compact header, MJD date and BCD time.
/// let bytes = [0x70, 0x00, 0x01, 0xc1, 0x00, 0xc0, 0x79, 0x12, 0x45, 0x00];
/// let result = decode_table(&bytes, &DecodeConfig::new(Revision::Rcs2)).unwrap();
/// assert_eq!(result.bytes_consumed, bytes.len());
/// assert!(result.crc.is_none());
/// ```
pub fn decode_table(buffer: &[u8], config: &DecodeConfig) -> Result<DecodeResult, DecodeFailure> {
    decode_table_with(buffer, config, &NoEmbeddedDecoder)
}

/// Like [`decode_table`], handing embedded payloads to `embedded`.
pub fn decode_table_with(
    buffer: &[u8],
    config: &DecodeConfig,
    embedded: &dyn EmbeddedDecoder,
) -> Result<DecodeResult, DecodeFailure> {
    let mut reader = TableReader::new(buffer, embedded);
    match decode_section(&mut reader, config) {
        Ok((header, body, crc)) => {
            let end_offset = reader.offset();
            Ok(DecodeResult {
                bytes_consumed: bytes_consumed(&header, end_offset, buffer.len()),
                header,
                body,
                crc,
                end_offset,
                fields: reader.finish(),
            })
        }
        Err(error) => Err(DecodeFailure {
            offset: error.offset(),
            error,
            fields: reader.finish(),
        }),
    }
}

type Section = (TableHeader, Option<TableBody>, Option<SectionCrc>);

fn bytes_consumed(header: &TableHeader, end_offset: usize, buffer_len: usize) -> usize {
    match (header.revision, header.section_end()) {
        (Revision::Rcs, Some(section_end)) => section_end
            .min(buffer_len)
            .saturating_sub(header.header_len),
        _ => end_offset,
    }
}

fn decode_section(r: &mut TableReader<'_>, config: &DecodeConfig) -> Result<Section, TableError> {
    let header = decode_header(r, config)?;
    let Some(kind) = header.kind() else {
        log::debug!(
            "no decoder for table id 0x{:02x}; header only",
            header.table_id
        );
        return Ok((header, None, None));
    };

    let body = r.group("body", |r| {
        r.label_group(kind.name());
        decode_body(r, kind, &header)
    })?;

    let crc = if kind.carries_crc(header.revision) {
        Some(decode_trailer(r, &header, kind)?)
    } else {
        None
    };
    Ok((header, Some(body), crc))
}

/// Emit any bytes between the body and the CRC as private data, then read
/// and check the CRC.
fn decode_trailer(
    r: &mut TableReader<'_>,
    header: &TableHeader,
    kind: TableKind,
) -> Result<SectionCrc, TableError> {
    if let Some(section_end) = header.section_end() {
        if section_end <= r.buffer().len() {
            let crc_start = section_end.saturating_sub(layout::CRC_LEN);
            if crc_start > r.offset() {
                r.private_data(crc_start - r.offset())?;
            }
        }
    }

    let offset = r.offset();
    let computed = SECTION_CRC.checksum(&r.buffer()[..offset]);
    let value = r.u32("crc32")?;
    let crc = SectionCrc {
        value,
        computed,
        offset,
    };
    if crc.is_valid() {
        r.label_last("valid");
    } else {
        r.label_last(format!("invalid, expected 0x{computed:08x}"));
        log::debug!(
            "{} CRC mismatch: 0x{value:08x} on the wire, 0x{computed:08x} computed",
            kind.name()
        );
    }
    Ok(crc)
}
