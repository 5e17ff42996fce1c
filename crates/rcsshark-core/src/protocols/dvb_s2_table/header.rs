//! Common table headers.
//!
//! RCS2 tables share one compact header. Under RCS the shape depends on the
//! table id: TDT has a bare length prefix, TIM uses the DSM-CC section header
//! and every other table the generic private section header.

use serde::Serialize;

use super::config::{DecodeConfig, Revision};
use super::error::TableError;
use super::layout::{self, TableKind, table_label};
use super::reader::TableReader;

const BROADCAST_MAC: [u8; 6] = [0xFF; 6];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableHeader {
    pub table_id: u8,
    /// Id used for dispatch; differs from `table_id` only for a broadcast TIM.
    pub dispatch_id: u8,
    pub revision: Revision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_syntax_indicator: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_indicator: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_length: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_interactive_id: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_number: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_next_indicator: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_number: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_section_number: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<[u8; 6]>,
    pub header_len: usize,
}

impl TableHeader {
    fn new(table_id: u8, revision: Revision) -> Self {
        Self {
            table_id,
            dispatch_id: table_id,
            revision,
            section_syntax_indicator: None,
            private_indicator: None,
            section_length: None,
            network_interactive_id: None,
            version_number: None,
            current_next_indicator: None,
            section_number: None,
            last_section_number: None,
            mac_address: None,
            header_len: 0,
        }
    }

    pub fn kind(&self) -> Option<TableKind> {
        TableKind::from_id(self.dispatch_id)
    }

    /// Offset one past the last section byte, when a section length was read.
    pub fn section_end(&self) -> Option<usize> {
        self.section_length
            .map(|len| layout::SECTION_LENGTH_PREFIX_LEN + usize::from(len))
    }

    fn read_section_length(&mut self, r: &mut TableReader<'_>) -> Result<(), TableError> {
        let [syntax, private, _, length] = r.bits(
            2,
            [
                layout::SECTION_SYNTAX_INDICATOR,
                layout::PRIVATE_INDICATOR,
                layout::SECTION_RESERVED,
                layout::SECTION_LENGTH,
            ],
        )?;
        self.section_syntax_indicator = Some(syntax == 1);
        self.private_indicator = Some(private == 1);
        self.section_length = Some(length as u16);
        Ok(())
    }

    fn read_version(&mut self, r: &mut TableReader<'_>) -> Result<(), TableError> {
        let [_, version, current_next] = r.bits(
            1,
            [
                layout::VERSION_RESERVED,
                layout::VERSION_NUMBER,
                layout::CURRENT_NEXT_INDICATOR,
            ],
        )?;
        self.version_number = Some(version as u8);
        self.current_next_indicator = Some(current_next == 1);
        Ok(())
    }
}

pub fn decode_header(
    r: &mut TableReader<'_>,
    config: &DecodeConfig,
) -> Result<TableHeader, TableError> {
    let start = r.offset();
    let mut header = r.group("header", |r| {
        let table_id = r.enumerated("table_id", 1, table_label)? as u8;
        let mut header = TableHeader::new(table_id, config.revision);
        match config.revision {
            Revision::Rcs2 => read_compact(r, &mut header)?,
            Revision::Rcs => match table_id {
                layout::TABLE_TDT => header.read_section_length(r)?,
                layout::TABLE_TIM => read_dsmcc(r, &mut header)?,
                _ => read_section(r, &mut header)?,
            },
        }
        Ok(header)
    })?;
    header.header_len = r.offset() - start;
    log::trace!(
        "table 0x{:02x} dispatched as 0x{:02x} ({} header, {} bytes)",
        header.table_id,
        header.dispatch_id,
        header.revision,
        header.header_len
    );
    Ok(header)
}

fn read_compact(r: &mut TableReader<'_>, header: &mut TableHeader) -> Result<(), TableError> {
    header.network_interactive_id = Some(r.u16("network_interactive_id")?);
    header.read_version(r)?;
    header.section_number = Some(r.u8("section_number")?);
    Ok(())
}

fn read_section(r: &mut TableReader<'_>, header: &mut TableHeader) -> Result<(), TableError> {
    header.read_section_length(r)?;
    header.network_interactive_id = Some(r.u16("network_interactive_id")?);
    header.read_version(r)?;
    header.section_number = Some(r.u8("section_number")?);
    header.last_section_number = Some(r.u8("last_section_number")?);
    Ok(())
}

fn read_dsmcc(r: &mut TableReader<'_>, header: &mut TableHeader) -> Result<(), TableError> {
    header.read_section_length(r)?;
    let mac6 = r.u8("mac_address_6")?;
    let mac5 = r.u8("mac_address_5")?;
    let [_, _, _, _, current_next] = r.bits(
        1,
        [
            layout::DSMCC_RESERVED,
            layout::PAYLOAD_SCRAMBLING_CONTROL,
            layout::ADDRESS_SCRAMBLING_CONTROL,
            layout::LLC_SNAP_FLAG,
            layout::CURRENT_NEXT_INDICATOR,
        ],
    )?;
    header.current_next_indicator = Some(current_next == 1);
    header.section_number = Some(r.u8("section_number")?);
    header.last_section_number = Some(r.u8("last_section_number")?);
    let mac4 = r.u8("mac_address_4")?;
    let mac3 = r.u8("mac_address_3")?;
    let mac2 = r.u8("mac_address_2")?;
    let mac1 = r.u8("mac_address_1")?;

    let mac = [mac1, mac2, mac3, mac4, mac5, mac6];
    header.mac_address = Some(mac);
    if mac == BROADCAST_MAC {
        header.dispatch_id = layout::TABLE_TIMB;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::decode_header;
    use crate::protocols::dvb_s2_table::config::{DecodeConfig, Revision};
    use crate::protocols::dvb_s2_table::embedded::NoEmbeddedDecoder;
    use crate::protocols::dvb_s2_table::error::TableError;
    use crate::protocols::dvb_s2_table::layout;
    use crate::protocols::dvb_s2_table::reader::TableReader;

    #[test]
    fn compact_header() {
        let data = [0xa0, 0x12, 0x34, 0xc5, 0x07];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let header = decode_header(&mut reader, &DecodeConfig::new(Revision::Rcs2)).unwrap();
        assert_eq!(header.network_interactive_id, Some(0x1234));
        assert_eq!(header.version_number, Some(2));
        assert_eq!(header.current_next_indicator, Some(true));
        assert_eq!(header.section_number, Some(7));
        assert_eq!(header.section_length, None);
        assert_eq!(header.header_len, 5);
    }

    #[test]
    fn generic_section_header() {
        let data = [0xa4, 0xb0, 0x25, 0x00, 0x01, 0xc3, 0x00, 0x00];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let header = decode_header(&mut reader, &DecodeConfig::new(Revision::Rcs)).unwrap();
        assert_eq!(header.section_syntax_indicator, Some(true));
        assert_eq!(header.private_indicator, Some(false));
        assert_eq!(header.section_length, Some(0x025));
        assert_eq!(header.section_end(), Some(3 + 0x25));
        assert_eq!(header.network_interactive_id, Some(1));
        assert_eq!(header.version_number, Some(1));
        assert_eq!(header.last_section_number, Some(0));
        assert_eq!(header.header_len, 8);
    }

    #[test]
    fn tdt_under_rcs_has_only_length_prefix() {
        let data = [0x70, 0x70, 0x05];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let header = decode_header(&mut reader, &DecodeConfig::new(Revision::Rcs)).unwrap();
        assert_eq!(header.section_length, Some(5));
        assert_eq!(header.network_interactive_id, None);
        assert_eq!(header.header_len, 3);
    }

    #[test]
    fn broadcast_tim_is_reclassified() {
        let data = [
            0xb0, 0xb0, 0x10, 0xff, 0xff, 0xc1, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff,
        ];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let header = decode_header(&mut reader, &DecodeConfig::new(Revision::Rcs)).unwrap();
        assert_eq!(header.table_id, layout::TABLE_TIM);
        assert_eq!(header.dispatch_id, layout::TABLE_TIMB);
        assert_eq!(header.header_len, 12);
    }

    #[test]
    fn unicast_tim_keeps_id_and_orders_mac() {
        let data = [
            0xb0, 0xb0, 0x10, 0x06, 0x05, 0xc1, 0x00, 0x00, 0x04, 0x03, 0x02, 0x01,
        ];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let header = decode_header(&mut reader, &DecodeConfig::new(Revision::Rcs)).unwrap();
        assert_eq!(header.dispatch_id, layout::TABLE_TIM);
        assert_eq!(header.mac_address, Some([1, 2, 3, 4, 5, 6]));
    }

    #[test]
    fn short_header_fails() {
        let data = [0xa0, 0x12];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let err = decode_header(&mut reader, &DecodeConfig::default()).unwrap_err();
        assert!(matches!(err, TableError::OutOfBounds { offset: 1, .. }));
    }
}
