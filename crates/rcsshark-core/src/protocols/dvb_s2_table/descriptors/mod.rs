//! Descriptor loops.
//!
//! Every descriptor starts with the same two bytes, `tag:u8` then
//! `length:u8`, whatever the tag. The payload decoder for a tag may read
//! less than `length`; the rest becomes `private_data`. Reads are confined
//! to the declared payload, so reading more fails as a malformed descriptor.

mod control;
mod link;
mod logon;

use serde::Serialize;

use super::embedded::EmbeddedProtocol;
use super::error::TableError;
use super::layout::{self, TableKind, descriptor_label};
use super::reader::TableReader;
use super::tables::cmt::{Correction, decode_correction};

pub use control::{ContentionControl, CorrectionControl, CorrectionMessageExtension, MobilityControl};
pub use link::{
    ForwardInteractionPath, ForwardTransmission, Linkage, LinkageDetail, Population,
    ReturnInteractionPath, RoutingLabel, SatelliteForwardLink, SatelliteReturnLink, VpiVci,
};
pub use logon::{
    LogonCapacity, LogonInitialize, LogonResponse, LogonTraffic, LowerLayerService,
    RandomAccessClass, RequestClass, ServiceLevel, SoftwareVersion, UnicastMac,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptor {
    pub tag: u8,
    pub length: u8,
    pub payload: DescriptorPayload,
    /// Payload bytes interpreted by the tag decoder.
    pub consumed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorPayload {
    NetworkName {
        name: String,
    },
    Linkage(Linkage),
    /// SNMP PDU handed to the embedded decoder.
    NetworkLayerInfo {
        offset: usize,
        len: usize,
    },
    CorrectionMessage(Correction),
    LogonInitialize(LogonInitialize),
    EchoValue {
        echo_value: u16,
    },
    RcsContent {
        table_ids: Vec<u8>,
    },
    SatelliteForwardLink(SatelliteForwardLink),
    SatelliteReturnLink(SatelliteReturnLink),
    ContentionControl(ContentionControl),
    CorrectionControl(CorrectionControl),
    ForwardInteractionPath(Vec<ForwardInteractionPath>),
    ReturnInteractionPath(ReturnInteractionPath),
    MobilityControl(MobilityControl),
    CorrectionMessageExtension(CorrectionMessageExtension),
    LogonResponse(LogonResponse),
    LowerLayerService(LowerLayerService),
    LowestSoftwareVersion(Vec<SoftwareVersion>),
    Unknown {
        data: Vec<u8>,
    },
}

/// Decode `count` consecutive descriptors found in a table of kind `table`.
pub fn decode_descriptors(
    r: &mut TableReader<'_>,
    count: usize,
    table: TableKind,
) -> Result<Vec<Descriptor>, TableError> {
    let mut descriptors = Vec::with_capacity(count.min(r.remaining()));
    for _ in 0..count {
        descriptors.push(r.group("descriptor", |r| decode_descriptor(r, table))?);
    }
    Ok(descriptors)
}

/// Count the descriptors packed into the next `region_len` bytes without
/// moving the cursor.
///
/// Relies on every descriptor sharing the `tag, length` prefix: the length
/// byte is always the second byte, so the walk never needs to know the tag.
/// The walk must land exactly on the region end.
pub fn count_descriptors(r: &TableReader<'_>, region_len: usize) -> Result<usize, TableError> {
    let cursor = r.cursor();
    let mut walked = 0usize;
    let mut count = 0usize;
    while walked < region_len {
        let length = cursor.peek_at(walked + 1, 1)?[0];
        walked += layout::DESCRIPTOR_PREFIX_LEN + usize::from(length);
        count += 1;
    }
    if walked != region_len {
        return Err(TableError::MalformedRegion {
            region: "descriptor loop",
            declared: region_len,
            consumed: walked,
            offset: r.offset(),
        });
    }
    Ok(count)
}

/// Pre-scan a byte-length bounded descriptor region, then decode it.
pub fn decode_descriptor_region(
    r: &mut TableReader<'_>,
    region_len: usize,
    table: TableKind,
) -> Result<Vec<Descriptor>, TableError> {
    let count = count_descriptors(r, region_len)?;
    decode_descriptors(r, count, table)
}

fn decode_descriptor(r: &mut TableReader<'_>, table: TableKind) -> Result<Descriptor, TableError> {
    let tag = r.enumerated("descriptor_tag", 1, descriptor_label)? as u8;
    r.label_group(descriptor_label(u64::from(tag)).unwrap_or("unknown_descriptor"));
    let length = r.u8("descriptor_length")?;
    let start = r.offset();
    let declared = usize::from(length);
    let end = start + declared;

    let mut payload = r.limited(
        end,
        |r| decode_payload(r, tag, declared, end),
        |reached| TableError::MalformedDescriptor {
            tag,
            declared_length: declared,
            actual_consumed: reached - start,
            offset: start,
        },
    )?;
    let mut consumed = r.offset() - start;

    // A broadcast TIM appends the forward link NCR after the link fields.
    if let DescriptorPayload::SatelliteForwardLink(link) = &mut payload {
        if table == TableKind::Timb && declared - consumed == layout::NCR_LEN {
            link.ncr = Some(r.ncr("ncr")?);
            consumed += layout::NCR_LEN;
        }
    }

    let private_data = r.private_data(declared - consumed)?.map(<[u8]>::to_vec);
    Ok(Descriptor {
        tag,
        length,
        payload,
        consumed,
        private_data,
    })
}

fn decode_payload(
    r: &mut TableReader<'_>,
    tag: u8,
    length: usize,
    end: usize,
) -> Result<DescriptorPayload, TableError> {
    let payload = match tag {
        layout::DESC_NETWORK_NAME => DescriptorPayload::NetworkName {
            name: r.text("network_name", length)?,
        },
        layout::DESC_LINKAGE => DescriptorPayload::Linkage(link::decode_linkage(r)?),
        layout::DESC_NETWORK_LAYER_INFO => {
            let offset = r.offset();
            let pdu = r.bytes("snmp_pdu", length)?;
            let fields = r
                .embedded()
                .decode_embedded(EmbeddedProtocol::Snmp, offset, pdu);
            r.attach(fields);
            DescriptorPayload::NetworkLayerInfo {
                offset,
                len: length,
            }
        }
        layout::DESC_CORRECTION_MESSAGE => {
            DescriptorPayload::CorrectionMessage(decode_correction(r)?)
        }
        layout::DESC_LOGON_INITIALIZE => {
            DescriptorPayload::LogonInitialize(logon::decode_logon_initialize(r)?)
        }
        layout::DESC_ECHO_VALUE => DescriptorPayload::EchoValue {
            echo_value: r.u16("echo_value")?,
        },
        layout::DESC_RCS_CONTENT => DescriptorPayload::RcsContent {
            table_ids: link::decode_rcs_content(r, end)?,
        },
        layout::DESC_SATELLITE_FORWARD_LINK => {
            DescriptorPayload::SatelliteForwardLink(link::decode_satellite_forward_link(r)?)
        }
        layout::DESC_SATELLITE_RETURN_LINK => {
            DescriptorPayload::SatelliteReturnLink(link::decode_satellite_return_link(r)?)
        }
        layout::DESC_CONTENTION_CONTROL => {
            DescriptorPayload::ContentionControl(control::decode_contention_control(r)?)
        }
        layout::DESC_CORRECTION_CONTROL => {
            DescriptorPayload::CorrectionControl(control::decode_correction_control(r)?)
        }
        layout::DESC_FORWARD_INTERACTION_PATH => DescriptorPayload::ForwardInteractionPath(
            link::decode_forward_interaction_path(r, end)?,
        ),
        layout::DESC_RETURN_INTERACTION_PATH => DescriptorPayload::ReturnInteractionPath(
            link::decode_return_interaction_path(r)?,
        ),
        layout::DESC_MOBILITY_CONTROL => {
            DescriptorPayload::MobilityControl(control::decode_mobility_control(r)?)
        }
        layout::DESC_CORRECTION_MESSAGE_EXTENSION => {
            DescriptorPayload::CorrectionMessageExtension(
                control::decode_correction_message_extension(r)?,
            )
        }
        layout::DESC_LOGON_RESPONSE => {
            DescriptorPayload::LogonResponse(logon::decode_logon_response(r)?)
        }
        layout::DESC_LOWER_LAYER_SERVICE => {
            DescriptorPayload::LowerLayerService(logon::decode_lower_layer_service(r)?)
        }
        layout::DESC_LOWEST_SOFTWARE_VERSION => {
            DescriptorPayload::LowestSoftwareVersion(logon::decode_lowest_software_version(r)?)
        }
        _ => {
            log::debug!("skipping {length} bytes of unknown descriptor 0x{tag:02x}");
            DescriptorPayload::Unknown {
                data: r.bytes("data", length)?.to_vec(),
            }
        }
    };
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::{
        DescriptorPayload, ForwardTransmission, count_descriptors, decode_descriptor_region,
        decode_descriptors,
    };
    use crate::protocols::dvb_s2_table::embedded::{
        EmbeddedDecoder, EmbeddedProtocol, NoEmbeddedDecoder,
    };
    use crate::protocols::dvb_s2_table::error::TableError;
    use crate::protocols::dvb_s2_table::field::{Field, FieldValue};
    use crate::protocols::dvb_s2_table::layout::TableKind;
    use crate::protocols::dvb_s2_table::reader::TableReader;

    fn forward_link(extra: &[u8]) -> Vec<u8> {
        let mut payload = vec![
            0x01, // satellite_id
            0x00, 0x02, // beam_id
            0x03, // ncc_id
            0x21, // multiplex_usage=1 local_multiplex_id=1
            0x00, 0xbe, 0xbc, 0x20, // frequency
            0x01, 0x30, // orbital_position
            0x8d, // east, DVB-S2 CCM, no scrambling index, roll_off=1
            0x00, 0x75, 0x30, // symbol_rate
            0x05, // input_stream_identifier
        ];
        payload.extend_from_slice(extra);
        let mut descriptor = vec![0xa8, payload.len() as u8];
        descriptor.extend(payload);
        descriptor
    }

    #[test]
    fn unknown_tag_skips_declared_length() {
        let data = [0xfe, 0x05, 1, 2, 3, 4, 5, 0xa6, 0x02, 0x12, 0x34];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let descriptors = decode_descriptors(&mut reader, 2, TableKind::Fat).unwrap();
        assert_eq!(
            descriptors[0].payload,
            DescriptorPayload::Unknown {
                data: vec![1, 2, 3, 4, 5]
            }
        );
        assert_eq!(
            descriptors[1].payload,
            DescriptorPayload::EchoValue { echo_value: 0x1234 }
        );
        assert_eq!(reader.offset(), data.len());

        let fields = reader.finish();
        assert_eq!(fields[0].children.len(), 3);
        assert_eq!(fields[0].label.as_deref(), Some("unknown_descriptor"));
    }

    #[test]
    fn short_payload_keeps_private_data() {
        let data = [0xa6, 0x04, 0x00, 0x07, 0xaa, 0xbb];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let descriptors = decode_descriptors(&mut reader, 1, TableKind::Fat).unwrap();
        assert_eq!(descriptors[0].consumed, 2);
        assert_eq!(descriptors[0].private_data, Some(vec![0xaa, 0xbb]));
        assert_eq!(reader.offset(), 6);
    }

    #[test]
    fn overrun_is_malformed() {
        // echo value needs two bytes but the descriptor declares one
        let data = [0xa6, 0x01, 0x00, 0x07];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let err = decode_descriptors(&mut reader, 1, TableKind::Fat).unwrap_err();
        assert_eq!(
            err,
            TableError::MalformedDescriptor {
                tag: 0xa6,
                declared_length: 1,
                actual_consumed: 2,
                offset: 2
            }
        );
        let fields = reader.finish();
        assert_eq!(fields[0].children.len(), 2);
        assert!(fields[0].child("echo_value").is_none());
    }

    #[test]
    fn broadcast_tim_forward_link_carries_ncr() {
        let data = forward_link(&[0x00, 0x00, 0x00, 0x01, 0x00, 0x05]);
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let descriptors = decode_descriptors(&mut reader, 1, TableKind::Timb).unwrap();
        let DescriptorPayload::SatelliteForwardLink(link) = &descriptors[0].payload else {
            panic!("expected forward link");
        };
        assert_eq!(
            link.transmission,
            ForwardTransmission::DvbS2Ccm {
                input_stream_identifier: 5
            }
        );
        let ncr = link.ncr.unwrap();
        assert_eq!((ncr.base, ncr.extension), (2, 5));
        assert!(descriptors[0].private_data.is_none());
    }

    #[test]
    fn unicast_tim_forward_link_keeps_private_bytes() {
        let data = forward_link(&[0x00, 0x00, 0x00, 0x01, 0x00, 0x05]);
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let descriptors = decode_descriptors(&mut reader, 1, TableKind::Tim).unwrap();
        let DescriptorPayload::SatelliteForwardLink(link) = &descriptors[0].payload else {
            panic!("expected forward link");
        };
        assert!(link.ncr.is_none());
        assert_eq!(descriptors[0].private_data.as_ref().map(Vec::len), Some(6));
    }

    #[test]
    fn pre_scan_counts_to_region_end() {
        let data = [
            0x40, 0x02, b'n', b'1', // network name
            0xfe, 0x00, // empty unknown
            0xa6, 0x02, 0x00, 0x01, // echo value
            0xff, // outside the region
        ];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        assert_eq!(count_descriptors(&reader, 10).unwrap(), 3);
        assert_eq!(reader.offset(), 0);
        let descriptors = decode_descriptor_region(&mut reader, 10, TableKind::Nit).unwrap();
        assert_eq!(descriptors.len(), 3);
        assert_eq!(reader.offset(), 10);
    }

    #[test]
    fn pre_scan_rejects_straddling_descriptor() {
        let data = [0x40, 0x03, b'a', b'b', b'c'];
        let reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let err = count_descriptors(&reader, 4).unwrap_err();
        assert!(matches!(
            err,
            TableError::MalformedRegion {
                declared: 4,
                consumed: 5,
                ..
            }
        ));
    }

    struct Recorder;

    impl EmbeddedDecoder for Recorder {
        fn decode_embedded(
            &self,
            protocol: EmbeddedProtocol,
            offset: usize,
            payload: &[u8],
        ) -> Vec<Field> {
            assert_eq!(protocol, EmbeddedProtocol::Snmp);
            vec![Field::new(
                "snmp",
                offset,
                payload.len(),
                FieldValue::Bytes(payload.to_vec()),
            )]
        }
    }

    #[test]
    fn network_layer_info_goes_to_embedded_decoder() {
        let data = [0xa0, 0x03, 0x30, 0x01, 0x00];
        let mut reader = TableReader::new(&data, &Recorder);
        let descriptors = decode_descriptors(&mut reader, 1, TableKind::Tim).unwrap();
        assert_eq!(
            descriptors[0].payload,
            DescriptorPayload::NetworkLayerInfo { offset: 2, len: 3 }
        );
        let fields = reader.finish();
        let snmp = fields[0].child("snmp").unwrap();
        assert_eq!((snmp.offset, snmp.len), (2, 3));
    }
}
