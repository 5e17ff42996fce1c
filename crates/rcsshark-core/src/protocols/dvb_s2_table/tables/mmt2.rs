use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::Serialize;

use crate::protocols::dvb_s2_table::descriptors::{Descriptor, decode_descriptor_region};
use crate::protocols::dvb_s2_table::error::TableError;
use crate::protocols::dvb_s2_table::layout::{self, TableKind};
use crate::protocols::dvb_s2_table::reader::{BitField, TableReader};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MulticastMappingTable {
    pub descriptors: Vec<Descriptor>,
    pub mappings: Vec<MulticastMapping>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MulticastMapping {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_address: Option<IpAddr>,
    pub group_address: IpAddr,
    pub pid: u16,
    pub mac24: u32,
}

pub(super) fn decode(r: &mut TableReader<'_>) -> Result<MulticastMappingTable, TableError> {
    let [_, region_len] = r.bits(
        2,
        [
            BitField::new("reserved", 0xF000),
            BitField::new("descriptor_loop_length", 0x0FFF),
        ],
    )?;
    let descriptors = decode_descriptor_region(r, region_len as usize, TableKind::Mmt2)?;

    let count = r.u8("multicast_map_count")?;
    let mappings = r.counted(
        "multicast_mapping",
        u64::from(count),
        layout::MMT2_MAPPINGS,
        |r, _| {
            let [ipv6, source_specific, _] = r.bits(
                1,
                [
                    BitField::new("ipv6_flag", 0x80),
                    BitField::new("source_specific_flag", 0x40),
                    BitField::new("reserved", 0x3F),
                ],
            )?;
            let ipv6 = ipv6 == 1;
            let source_address = if source_specific == 1 {
                Some(address(r, "source_address", ipv6)?)
            } else {
                None
            };
            let group_address = address(r, "group_address", ipv6)?;
            let [_, pid] = r.bits(
                2,
                [
                    BitField::new("reserved", 0xE000),
                    BitField::new("pid", 0x1FFF),
                ],
            )?;
            Ok(MulticastMapping {
                source_address,
                group_address,
                pid: pid as u16,
                mac24: r.u24("mac24")?,
            })
        },
    )?;
    Ok(MulticastMappingTable {
        descriptors,
        mappings,
    })
}

fn address(r: &mut TableReader<'_>, name: &'static str, ipv6: bool) -> Result<IpAddr, TableError> {
    let address = if ipv6 {
        let bytes = r.bytes(name, 16)?;
        let mut octets = [0u8; 16];
        octets.copy_from_slice(bytes);
        IpAddr::V6(Ipv6Addr::from(octets))
    } else {
        let bytes = r.bytes(name, 4)?;
        IpAddr::V4(Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]))
    };
    r.label_last(address.to_string());
    Ok(address)
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::decode;
    use crate::protocols::dvb_s2_table::embedded::NoEmbeddedDecoder;
    use crate::protocols::dvb_s2_table::reader::TableReader;

    #[test]
    fn source_specific_ipv4_mapping() {
        let data = [
            0xf0, 0x04, 0xa6, 0x02, 0x00, 0x01, // one echo value descriptor
            0x01, // one mapping
            0x40, 10, 0, 0, 1, 239, 1, 2, 3, 0xe1, 0x00, 0x01, 0x00, 0x5e,
        ];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let table = decode(&mut reader).unwrap();
        assert_eq!(table.descriptors.len(), 1);
        let mapping = table.mappings[0];
        assert_eq!(
            mapping.source_address,
            Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)))
        );
        assert_eq!(
            mapping.group_address,
            IpAddr::V4(Ipv4Addr::new(239, 1, 2, 3))
        );
        assert_eq!(mapping.pid, 0x0100);
        assert_eq!(mapping.mac24, 0x01005e);
        assert_eq!(reader.remaining(), 0);
    }
}
