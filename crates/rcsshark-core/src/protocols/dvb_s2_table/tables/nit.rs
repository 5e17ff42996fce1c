//! Network information and RCS map tables share one layout: a network
//! descriptor region, then a byte-bounded loop of transport streams each
//! with its own descriptor region.

use serde::Serialize;

use crate::protocols::dvb_s2_table::descriptors::{Descriptor, decode_descriptor_region};
use crate::protocols::dvb_s2_table::error::TableError;
use crate::protocols::dvb_s2_table::layout::TableKind;
use crate::protocols::dvb_s2_table::reader::TableReader;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkInformationTable {
    pub network_descriptors: Vec<Descriptor>,
    pub transport_streams: Vec<TransportStream>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportStream {
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub descriptors: Vec<Descriptor>,
}

pub(super) fn decode(
    r: &mut TableReader<'_>,
    kind: TableKind,
) -> Result<NetworkInformationTable, TableError> {
    let network_len = region_length(r, "network_descriptors_length")?;
    let network_descriptors = r.group("network_descriptors", |r| {
        decode_descriptor_region(r, network_len, kind)
    })?;

    let loop_len = region_length(r, "transport_stream_loop_length")?;
    let loop_start = r.offset();
    let loop_end = loop_start + loop_len;
    let transport_streams = r.limited(
        loop_end,
        |r| {
            r.until("transport_stream", loop_end, |r| {
                let transport_stream_id = r.u16("transport_stream_id")?;
                let original_network_id = r.u16("original_network_id")?;
                let len = region_length(r, "transport_descriptors_length")?;
                let descriptors = decode_descriptor_region(r, len, kind)?;
                Ok(TransportStream {
                    transport_stream_id,
                    original_network_id,
                    descriptors,
                })
            })
        },
        |reached| TableError::MalformedRegion {
            region: "transport stream loop",
            declared: loop_len,
            consumed: reached - loop_start,
            offset: loop_start,
        },
    )?;
    Ok(NetworkInformationTable {
        network_descriptors,
        transport_streams,
    })
}

fn region_length(r: &mut TableReader<'_>, name: &'static str) -> Result<usize, TableError> {
    Ok(r.masked(name, 2, 0x0FFF)? as usize)
}

#[cfg(test)]
mod tests {
    use super::decode;
    use crate::protocols::dvb_s2_table::descriptors::DescriptorPayload;
    use crate::protocols::dvb_s2_table::embedded::NoEmbeddedDecoder;
    use crate::protocols::dvb_s2_table::error::TableError;
    use crate::protocols::dvb_s2_table::layout::TableKind;
    use crate::protocols::dvb_s2_table::reader::TableReader;

    #[test]
    fn network_and_transport_regions() {
        let data = [
            0xf0, 0x05, 0x40, 0x03, b'r', b'c', b's', // network name
            0xf0, 0x0a, // transport stream loop
            0x00, 0x01, 0x00, 0x02, 0xf0, 0x04, 0xa6, 0x02, 0x00, 0x09,
        ];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let table = decode(&mut reader, TableKind::Nit).unwrap();
        assert_eq!(
            table.network_descriptors[0].payload,
            DescriptorPayload::NetworkName {
                name: "rcs".to_string()
            }
        );
        assert_eq!(table.transport_streams.len(), 1);
        assert_eq!(table.transport_streams[0].descriptors.len(), 1);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn transport_loop_overrun_is_malformed() {
        let data = [
            0xf0, 0x00, // no network descriptors
            0xf0, 0x04, // loop declares 4 bytes
            0x00, 0x01, 0x00, 0x02, 0xf0, 0x00, // entry needs 6
        ];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let err = decode(&mut reader, TableKind::Rmt).unwrap_err();
        assert_eq!(
            err,
            TableError::MalformedRegion {
                region: "transport stream loop",
                declared: 4,
                consumed: 6,
                offset: 4
            }
        );
        let fields = reader.finish();
        let entry = fields.iter().find(|field| field.name == "transport_stream").unwrap();
        assert!(entry.child("transport_descriptors_length").is_none());
        assert_eq!(entry.offset + entry.len, 8);
    }
}
