//! Field-emitting reads on top of [`ByteCursor`].
//!
//! Each read consumes bytes and appends exactly one node to the innermost
//! open group. A failed read emits nothing, so the tree handed back on error
//! is always a clean prefix of what was decoded.

use serde::Serialize;

use crate::protocols::common::ByteCursor;
use crate::protocols::common::reader::{apply_mask, sign_extend};

use super::embedded::EmbeddedDecoder;
use super::error::TableError;
use super::field::{Field, FieldValue};
use super::layout::{self, LoopCount};

pub type Labels = fn(u64) -> Option<&'static str>;

/// One named sub-field of a multi-bit word.
#[derive(Debug, Clone, Copy)]
pub struct BitField {
    pub name: &'static str,
    pub mask: u64,
    pub labels: Option<Labels>,
}

impl BitField {
    pub const fn new(name: &'static str, mask: u64) -> Self {
        Self {
            name,
            mask,
            labels: None,
        }
    }

    pub const fn labeled(name: &'static str, mask: u64, labels: Labels) -> Self {
        Self {
            name,
            mask,
            labels: Some(labels),
        }
    }
}

/// Network Clock Reference: 33-bit base at 90 kHz plus a 9-bit 27 MHz
/// extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ncr {
    pub base: u64,
    pub extension: u16,
}

impl Ncr {
    /// Value in 27 MHz ticks.
    pub fn ticks(&self) -> u64 {
        self.base * 300 + u64::from(self.extension)
    }
}

pub struct TableReader<'a> {
    cursor: ByteCursor<'a>,
    open: Vec<Field>,
    embedded: &'a dyn EmbeddedDecoder,
}

impl<'a> TableReader<'a> {
    pub fn new(buffer: &'a [u8], embedded: &'a dyn EmbeddedDecoder) -> Self {
        Self {
            cursor: ByteCursor::new(buffer),
            open: vec![Field::group("table", 0)],
            embedded,
        }
    }

    pub fn offset(&self) -> usize {
        self.cursor.offset()
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    pub fn buffer(&self) -> &'a [u8] {
        self.cursor.buffer()
    }

    pub fn cursor(&self) -> &ByteCursor<'a> {
        &self.cursor
    }

    pub fn embedded(&self) -> &'a dyn EmbeddedDecoder {
        self.embedded
    }

    fn emit(&mut self, field: Field) {
        if let Some(parent) = self.open.last_mut() {
            parent.children.push(field);
        }
    }

    fn emit_value(&mut self, name: &'static str, offset: usize, value: FieldValue) {
        let len = self.cursor.offset() - offset;
        self.emit(Field::new(name, offset, len, value));
    }

    pub fn u8(&mut self, name: &'static str) -> Result<u8, TableError> {
        let offset = self.offset();
        let value = self.cursor.read_u8()?;
        self.emit_value(name, offset, FieldValue::Unsigned(u64::from(value)));
        Ok(value)
    }

    pub fn u16(&mut self, name: &'static str) -> Result<u16, TableError> {
        let offset = self.offset();
        let value = self.cursor.read_u16()?;
        self.emit_value(name, offset, FieldValue::Unsigned(u64::from(value)));
        Ok(value)
    }

    pub fn u24(&mut self, name: &'static str) -> Result<u32, TableError> {
        let offset = self.offset();
        let value = self.cursor.read_u24()?;
        self.emit_value(name, offset, FieldValue::Unsigned(u64::from(value)));
        Ok(value)
    }

    pub fn u32(&mut self, name: &'static str) -> Result<u32, TableError> {
        let offset = self.offset();
        let value = self.cursor.read_u32()?;
        self.emit_value(name, offset, FieldValue::Unsigned(u64::from(value)));
        Ok(value)
    }

    pub fn uint(&mut self, name: &'static str, width: usize) -> Result<u64, TableError> {
        let offset = self.offset();
        let value = self.cursor.read_uint(width)?;
        self.emit_value(name, offset, FieldValue::Unsigned(value));
        Ok(value)
    }

    pub fn int(&mut self, name: &'static str, width: usize) -> Result<i64, TableError> {
        let offset = self.offset();
        let raw = self.cursor.read_uint(width)?;
        let value = sign_extend(raw, (width * 8) as u32);
        self.emit_value(name, offset, FieldValue::Signed(value));
        Ok(value)
    }

    pub fn i8(&mut self, name: &'static str) -> Result<i8, TableError> {
        Ok(self.int(name, 1)? as i8)
    }

    pub fn i16(&mut self, name: &'static str) -> Result<i16, TableError> {
        Ok(self.int(name, 2)? as i16)
    }

    pub fn i24(&mut self, name: &'static str) -> Result<i32, TableError> {
        Ok(self.int(name, 3)? as i32)
    }

    /// IEEE-754 single precision, big-endian.
    pub fn f32(&mut self, name: &'static str) -> Result<f32, TableError> {
        let offset = self.offset();
        let value = f32::from_bits(self.cursor.read_u32()?);
        self.emit_value(name, offset, FieldValue::Float(f64::from(value)));
        Ok(value)
    }

    /// Unsigned value with a symbolic name when `labels` knows it.
    pub fn enumerated(
        &mut self,
        name: &'static str,
        width: usize,
        labels: Labels,
    ) -> Result<u64, TableError> {
        let offset = self.offset();
        let value = self.cursor.read_uint(width)?;
        let field_value = match labels(value) {
            Some(label) => FieldValue::Enumerated { value, name: label },
            None => FieldValue::Unsigned(value),
        };
        self.emit_value(name, offset, field_value);
        Ok(value)
    }

    /// Read one `width`-byte word and emit a node per sub-field.
    pub fn bits<const N: usize>(
        &mut self,
        width: usize,
        fields: [BitField; N],
    ) -> Result<[u64; N], TableError> {
        let offset = self.offset();
        let raw = self.cursor.read_uint(width)?;
        let mut values = [0u64; N];
        for (slot, field) in values.iter_mut().zip(fields.iter()) {
            let value = apply_mask(raw, field.mask);
            *slot = value;
            let mut node = Field::new(
                field.name,
                offset,
                width,
                FieldValue::Bits {
                    value,
                    mask: field.mask,
                },
            );
            node.label = field.labels.and_then(|labels| labels(value)).map(str::to_string);
            self.emit(node);
        }
        Ok(values)
    }

    /// One sub-field of a word whose remaining bits are reserved.
    pub fn masked(
        &mut self,
        name: &'static str,
        width: usize,
        mask: u64,
    ) -> Result<u64, TableError> {
        let offset = self.offset();
        let value = self.cursor.read_masked(width, mask)?;
        self.emit_value(name, offset, FieldValue::Bits { value, mask });
        Ok(value)
    }

    pub fn bytes(&mut self, name: &'static str, len: usize) -> Result<&'a [u8], TableError> {
        let offset = self.offset();
        let bytes = self.cursor.read_bytes(len)?;
        self.emit_value(name, offset, FieldValue::Bytes(bytes.to_vec()));
        Ok(bytes)
    }

    pub fn text(&mut self, name: &'static str, len: usize) -> Result<String, TableError> {
        let offset = self.offset();
        let bytes = self.cursor.read_bytes(len)?;
        let text = String::from_utf8_lossy(bytes).into_owned();
        self.emit_value(name, offset, FieldValue::Text(text.clone()));
        Ok(text)
    }

    /// Bytes left unread at the end of a length-bounded region.
    pub fn private_data(&mut self, len: usize) -> Result<Option<&'a [u8]>, TableError> {
        if len == 0 {
            return Ok(None);
        }
        self.bytes("private_data", len).map(Some)
    }

    /// 48-bit NCR: base(33) reserved(6) extension(9).
    pub fn ncr(&mut self, name: &'static str) -> Result<Ncr, TableError> {
        let offset = self.offset();
        self.cursor.require(layout::NCR_LEN)?;
        let base = self.cursor.read_bits(0, layout::NCR_BASE_BITS)?;
        let reserved = self
            .cursor
            .read_bits(layout::NCR_BASE_BITS as usize, 6)?;
        let extension = self
            .cursor
            .read_bits(layout::NCR_EXTENSION_BIT_OFFSET, layout::NCR_EXTENSION_BITS)?
            as u16;
        self.cursor.skip(layout::NCR_LEN)?;

        let mut group = Field::group(name, offset);
        group.len = layout::NCR_LEN;
        group.label = Some(format!("{base}:{extension}"));
        group.children = vec![
            Field::new(
                "base",
                offset,
                5,
                FieldValue::Bits {
                    value: base,
                    mask: 0xFF_FFFF_FF80,
                },
            ),
            Field::new(
                "reserved",
                offset + 4,
                1,
                FieldValue::Bits {
                    value: reserved,
                    mask: 0x7E,
                },
            ),
            Field::new(
                "extension",
                offset + 4,
                2,
                FieldValue::Bits {
                    value: u64::from(extension),
                    mask: 0x01FF,
                },
            ),
        ];
        self.emit(group);
        Ok(Ncr { base, extension })
    }

    /// Set the label of the most recently emitted node.
    pub fn label_last(&mut self, label: impl Into<String>) {
        if let Some(last) = self.open.last_mut().and_then(|group| group.children.last_mut()) {
            last.label = Some(label.into());
        }
    }

    /// Set the label of the innermost open group.
    pub fn label_group(&mut self, label: impl Into<String>) {
        if self.open.len() > 1 {
            if let Some(group) = self.open.last_mut() {
                group.label = Some(label.into());
            }
        }
    }

    fn open_group(&mut self, name: &'static str) {
        let offset = self.offset();
        self.open.push(Field::group(name, offset));
    }

    fn close_group(&mut self) {
        if self.open.len() < 2 {
            return;
        }
        if let Some(mut group) = self.open.pop() {
            group.len = self.cursor.offset() - group.offset;
            self.emit(group);
        }
    }

    /// Run `decode` with its fields nested under a group node. On error the
    /// group stays open and is closed by [`TableReader::finish`].
    pub fn group<T>(
        &mut self,
        name: &'static str,
        decode: impl FnOnce(&mut Self) -> Result<T, TableError>,
    ) -> Result<T, TableError> {
        self.open_group(name);
        let value = decode(self)?;
        self.close_group();
        Ok(value)
    }

    /// Loop `convention.iterations(raw)` times, one group per iteration.
    pub fn counted<T>(
        &mut self,
        name: &'static str,
        raw: u64,
        convention: LoopCount,
        mut decode: impl FnMut(&mut Self, usize) -> Result<T, TableError>,
    ) -> Result<Vec<T>, TableError> {
        let count = convention.iterations(raw);
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        for index in 0..count {
            let item = self.group(name, |r| {
                r.label_group(format!("#{index}"));
                decode(r, index)
            })?;
            items.push(item);
        }
        Ok(items)
    }

    /// Decode entries until the cursor reaches `end`.
    pub fn until<T>(
        &mut self,
        name: &'static str,
        end: usize,
        mut decode: impl FnMut(&mut Self) -> Result<T, TableError>,
    ) -> Result<Vec<T>, TableError> {
        let mut items = Vec::new();
        while self.offset() < end {
            let index = items.len();
            let item = self.group(name, |r| {
                r.label_group(format!("#{index}"));
                decode(r)
            })?;
            items.push(item);
        }
        Ok(items)
    }

    /// Run `decode` with reads confined to `..end`.
    ///
    /// When the whole region is inside the buffer, a read that would cross
    /// `end` fails through `overrun`, which receives the offset the read
    /// would have reached. A region cut short by the buffer end keeps
    /// reporting [`TableError::OutOfBounds`].
    pub fn limited<T>(
        &mut self,
        end: usize,
        decode: impl FnOnce(&mut Self) -> Result<T, TableError>,
        overrun: impl FnOnce(usize) -> TableError,
    ) -> Result<T, TableError> {
        let enclosing = self.cursor.limit();
        let inside = end <= enclosing;
        self.cursor.set_limit(end.min(enclosing));
        let result = decode(self);
        self.cursor.set_limit(enclosing);
        match result {
            Err(TableError::OutOfBounds {
                requested, offset, ..
            }) if inside => Err(overrun(offset + requested)),
            other => other,
        }
    }

    /// Splice externally produced nodes under the innermost open group.
    pub fn attach(&mut self, fields: Vec<Field>) {
        if let Some(parent) = self.open.last_mut() {
            parent.children.extend(fields);
        }
    }

    /// Close every open group and return the top-level nodes.
    pub fn finish(mut self) -> Vec<Field> {
        while self.open.len() > 1 {
            self.close_group();
        }
        self.open
            .pop()
            .map(|root| root.children)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::{BitField, TableReader};
    use crate::protocols::dvb_s2_table::embedded::NoEmbeddedDecoder;
    use crate::protocols::dvb_s2_table::error::TableError;
    use crate::protocols::dvb_s2_table::field::FieldValue;
    use crate::protocols::dvb_s2_table::layout::{LoopCount, polarization_label};

    #[test]
    fn bit_fields_carry_mask_and_label() {
        let data = [0b0000_0110];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let [flag, polarization] = reader
            .bits(
                1,
                [
                    BitField::new("large_timing_uncertainty_flag", 0x04),
                    BitField::labeled("uplink_polarization", 0x03, polarization_label),
                ],
            )
            .unwrap();
        assert_eq!((flag, polarization), (1, 2));

        let fields = reader.finish();
        assert_eq!(fields.len(), 2);
        assert_eq!(
            fields[1].value,
            FieldValue::Bits {
                value: 2,
                mask: 0x03
            }
        );
        assert_eq!(fields[1].label.as_deref(), Some("circular left"));
        assert_eq!(fields[1].offset, 0);
    }

    #[test]
    fn signed_and_float_reads() {
        let mut data = vec![0xff, 0xff, 0xfe, 0x80];
        data.extend_from_slice(&1.5f32.to_be_bytes());
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        assert_eq!(reader.i24("offset").unwrap(), -2);
        assert_eq!(reader.i8("correction").unwrap(), -128);
        assert_eq!(reader.f32("x").unwrap(), 1.5);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn ncr_splits_base_and_extension() {
        // base = 1, extension = 0x1ff
        let data = [0x00, 0x00, 0x00, 0x00, 0x81, 0xff];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let ncr = reader.ncr("superframe_start_time").unwrap();
        assert_eq!(ncr.base, 1);
        assert_eq!(ncr.extension, 0x1ff);
        assert_eq!(ncr.ticks(), 300 + 0x1ff);

        let fields = reader.finish();
        let node = &fields[0];
        assert_eq!(node.len, 6);
        assert_eq!(node.child("base").unwrap().as_u64(), Some(1));
        assert_eq!(node.child("extension").unwrap().as_u64(), Some(0x1ff));
    }

    #[test]
    fn counted_loop_nests_items() {
        let data = [0x01, 0x0a, 0x0b];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let raw = reader.u8("loop_count").unwrap();
        let items = reader
            .counted("entry", u64::from(raw), LoopCount::RawPlusOne, |r, _| {
                r.u8("value")
            })
            .unwrap();
        assert_eq!(items, vec![0x0a, 0x0b]);

        let fields = reader.finish();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[2].label.as_deref(), Some("#1"));
        assert_eq!(fields[2].offset, 2);
        assert_eq!(fields[2].len, 1);
    }

    #[test]
    fn failed_read_leaves_clean_prefix() {
        let data = [0x05, 0x01];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let err = reader
            .group("body", |r| {
                r.u8("first")?;
                r.u16("second")
            })
            .unwrap_err();
        assert_eq!(
            err,
            TableError::OutOfBounds {
                requested: 2,
                available: 1,
                offset: 1
            }
        );
        let fields = reader.finish();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "body");
        assert_eq!(fields[0].children.len(), 1);
        assert_eq!(fields[0].len, 1);
    }

    #[test]
    fn limited_read_fails_before_emitting() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let err = reader
            .limited(
                3,
                |r| {
                    r.u16("first")?;
                    r.u16("second")
                },
                |reached| TableError::MalformedRegion {
                    region: "test region",
                    declared: 3,
                    consumed: reached,
                    offset: 0,
                },
            )
            .unwrap_err();
        assert!(matches!(err, TableError::MalformedRegion { consumed: 4, .. }));
        assert_eq!(reader.offset(), 2);
        assert_eq!(reader.remaining(), 2);

        let fields = reader.finish();
        assert_eq!(fields.len(), 1);
        assert_eq!((fields[0].offset, fields[0].len), (0, 2));
    }

    #[test]
    fn limited_past_buffer_end_stays_out_of_bounds() {
        let data = [0x01, 0x02];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let err = reader
            .limited(4, |r| r.u24("value"), |_| unreachable!())
            .unwrap_err();
        assert_eq!(
            err,
            TableError::OutOfBounds {
                requested: 3,
                available: 2,
                offset: 0
            }
        );
    }
}
