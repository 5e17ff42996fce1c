//! Logon and service-level descriptors.
//!
//! These carry most of the per-entry conditional layouts: every flag read
//! here gates whether the following fields exist.

use serde::Serialize;

use crate::protocols::dvb_s2_table::error::TableError;
use crate::protocols::dvb_s2_table::layout;
use crate::protocols::dvb_s2_table::reader::{BitField, TableReader};

const PID_RESERVED: BitField = BitField::new("reserved", 0xE000);
const LOW_NIBBLE_RESERVED: BitField = BitField::new("reserved", 0xF0);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogonInitialize {
    pub group_id: u8,
    pub logon_id: u16,
    pub security_handshake_required: bool,
    pub prefix_flag: bool,
    pub data_unit_labelling_flag: bool,
    pub mini_slot_flag: bool,
    pub contention_based_mini_slot_flag: bool,
    pub capacity_type_flag: bool,
    pub traffic: LogonTraffic,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<LogonCapacity>,
}

/// Return path addressing, selected by `traffic_burst_type` and
/// `connectivity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogonTraffic {
    AtmReturn {
        return_vpi: u8,
        return_vci: u16,
    },
    AtmSignalling {
        return_signalling_vpi: u8,
        return_signalling_vci: u16,
        forward_signalling_vpi: u8,
        forward_signalling_vci: u16,
    },
    MpegReturn {
        return_trf_pid: u16,
        return_ctrl_mngm_pid: u16,
    },
    MpegSignalling {
        return_signalling_pid: u16,
        forward_signalling_pid: u16,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogonCapacity {
    pub cra_level: u32,
    pub vbdc_max: u16,
    pub rbdc_max: u16,
    pub rbdc_timeout: u16,
}

pub(super) fn decode_logon_initialize(
    r: &mut TableReader<'_>,
) -> Result<LogonInitialize, TableError> {
    let group_id = r.u8("group_id")?;
    let logon_id = r.u16("logon_id")?;
    let [_, security, prefix, labelling, mini_slot, contention_mini_slot] = r.bits(
        1,
        [
            BitField::new("reserved", 0xE0),
            BitField::new("security_handshake_required", 0x10),
            BitField::new("prefix_flag", 0x08),
            BitField::new("data_unit_labelling_flag", 0x04),
            BitField::new("mini_slot_flag", 0x02),
            BitField::new("contention_based_mini_slot_flag", 0x01),
        ],
    )?;
    let [_, capacity_type, burst_type, connectivity, _] = r.bits(
        1,
        [
            BitField::new("reserved", 0x80),
            BitField::new("capacity_type_flag", 0x40),
            BitField::new("traffic_burst_type", 0x20),
            BitField::new("connectivity", 0x10),
            BitField::new("reserved", 0x0F),
        ],
    )?;

    let traffic = match (burst_type, connectivity) {
        (0, 0) => LogonTraffic::AtmReturn {
            return_vpi: r.u8("return_vpi")?,
            return_vci: r.u16("return_vci")?,
        },
        (0, _) => LogonTraffic::AtmSignalling {
            return_signalling_vpi: r.u8("return_signalling_vpi")?,
            return_signalling_vci: r.u16("return_signalling_vci")?,
            forward_signalling_vpi: r.u8("forward_signalling_vpi")?,
            forward_signalling_vci: r.u16("forward_signalling_vci")?,
        },
        (_, 0) => LogonTraffic::MpegReturn {
            return_trf_pid: pid(r, "return_trf_pid")?,
            return_ctrl_mngm_pid: pid(r, "return_ctrl_mngm_pid")?,
        },
        _ => LogonTraffic::MpegSignalling {
            return_signalling_pid: pid(r, "return_signalling_pid")?,
            forward_signalling_pid: pid(r, "forward_signalling_pid")?,
        },
    };

    let capacity = if capacity_type == 0 {
        let cra_level = r.u24("cra_level")?;
        let [_, vbdc_max] = r.bits(
            2,
            [
                BitField::new("reserved", 0xF800),
                BitField::new("vbdc_max", 0x07FF),
            ],
        )?;
        Some(LogonCapacity {
            cra_level,
            vbdc_max: vbdc_max as u16,
            rbdc_max: r.u16("rbdc_max")?,
            rbdc_timeout: r.u16("rbdc_timeout")?,
        })
    } else {
        None
    };

    Ok(LogonInitialize {
        group_id,
        logon_id,
        security_handshake_required: security == 1,
        prefix_flag: prefix == 1,
        data_unit_labelling_flag: labelling == 1,
        mini_slot_flag: mini_slot == 1,
        contention_based_mini_slot_flag: contention_mini_slot == 1,
        capacity_type_flag: capacity_type == 1,
        traffic,
        capacity,
    })
}

fn pid(r: &mut TableReader<'_>, name: &'static str) -> Result<u16, TableError> {
    let [_, pid] = r.bits(2, [PID_RESERVED, BitField::new(name, 0x1FFF)])?;
    Ok(pid as u16)
}

fn nibble(r: &mut TableReader<'_>, name: &'static str) -> Result<u8, TableError> {
    let [_, value] = r.bits(1, [LOW_NIBBLE_RESERVED, BitField::new(name, 0x0F)])?;
    Ok(value as u8)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogonResponse {
    pub keep_identifiers_after_logoff: bool,
    pub power_control_mode: u8,
    pub rcst_access_status: u8,
    pub logon_id: u16,
    pub lowest_assignment_id: u32,
    pub assignment_id_count: u8,
    pub unicast_macs: Vec<UnicastMac>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnicastMac {
    pub prefix_length: u8,
    pub unicast_mac24: u32,
}

pub(super) fn decode_logon_response(r: &mut TableReader<'_>) -> Result<LogonResponse, TableError> {
    let [keep, power_mode, access_status, _] = r.bits(
        1,
        [
            BitField::new("keep_identifiers_after_logoff", 0x80),
            BitField::new("power_control_mode", 0x60),
            BitField::new("rcst_access_status", 0x1C),
            BitField::new("reserved", 0x03),
        ],
    )?;
    let logon_id = r.u16("logon_id")?;
    let lowest_assignment_id = r.u24("lowest_assignment_id")?;
    let [assignment_id_count, mac_count] = r.bits(
        1,
        [
            BitField::new("assignment_id_count", 0xF0),
            BitField::new("unicast_mac24_count", 0x0F),
        ],
    )?;
    let unicast_macs = r.counted(
        "unicast_mac24",
        mac_count,
        layout::LOGON_RESPONSE_MACS,
        |r, _| {
            let [_, prefix_length] = r.bits(
                1,
                [
                    BitField::new("reserved", 0xE0),
                    BitField::new("prefix_length", 0x1F),
                ],
            )?;
            Ok(UnicastMac {
                prefix_length: prefix_length as u8,
                unicast_mac24: r.u24("unicast_mac24")?,
            })
        },
    )?;
    Ok(LogonResponse {
        keep_identifiers_after_logoff: keep == 1,
        power_control_mode: power_mode as u8,
        rcst_access_status: access_status as u8,
        logon_id,
        lowest_assignment_id,
        assignment_id_count: assignment_id_count as u8,
        unicast_macs,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowerLayerService {
    pub default_control_randomization_interval: u8,
    pub dynamic_rate_persistence: u8,
    pub volume_backlog_persistence: u8,
    pub services: Vec<ServiceLevel>,
    pub request_classes: Vec<RequestClass>,
    pub random_access_classes: Vec<RandomAccessClass>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceLevel {
    pub lls_index: u8,
    pub random_access: bool,
    pub dedicated_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nominal_rc_index: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nominal_da_ac_index: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditional_demand_rc_map: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditional_scheduler_da_ac_map: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nominal_ra_ac_index: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditional_scheduler_ra_ac_map: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestClass {
    pub rc_index: u8,
    pub volume_allowed: bool,
    pub rbdc_allowed: bool,
    pub maximum_service_rate: u16,
    pub minimum_service_rate: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constant_service_rate: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_backlog: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RandomAccessClass {
    pub ra_ac_index: u8,
    pub max_unique_payload_per_block: u8,
    pub max_consecutive_block_accessed: u8,
    pub min_idle_block: u8,
    pub defaults_for_ra_load_control: Vec<u8>,
}

pub(super) fn decode_lower_layer_service(
    r: &mut TableReader<'_>,
) -> Result<LowerLayerService, TableError> {
    let default_control_randomization_interval = r.u8("default_control_randomization_interval")?;
    let dynamic_rate_persistence = r.u8("dynamic_rate_persistence")?;
    let volume_backlog_persistence = r.u8("volume_backlog_persistence")?;

    let lls_count = nibble(r, "lls_count")?;
    let services = r.counted(
        "lls",
        u64::from(lls_count),
        layout::LOWER_LAYER_ENTRIES,
        |r, _| decode_service_level(r),
    )?;

    let rc_count = nibble(r, "rc_count")?;
    let request_classes = r.counted(
        "rc",
        u64::from(rc_count),
        layout::LOWER_LAYER_ENTRIES,
        |r, _| decode_request_class(r),
    )?;

    let ra_ac_count = nibble(r, "ra_ac_count")?;
    let random_access_classes = r.counted(
        "ra_ac",
        u64::from(ra_ac_count),
        layout::LOWER_LAYER_ENTRIES,
        |r, _| {
            let ra_ac_index = nibble(r, "ra_ac_index")?;
            let max_unique_payload_per_block = r.u8("max_unique_payload_per_block")?;
            let max_consecutive_block_accessed = r.u8("max_consecutive_block_accessed")?;
            let min_idle_block = r.u8("min_idle_block")?;
            let size = r.u8("defaults_field_size")?;
            let defaults = r.bytes("defaults_for_ra_load_control", usize::from(size))?;
            Ok(RandomAccessClass {
                ra_ac_index,
                max_unique_payload_per_block,
                max_consecutive_block_accessed,
                min_idle_block,
                defaults_for_ra_load_control: defaults.to_vec(),
            })
        },
    )?;

    Ok(LowerLayerService {
        default_control_randomization_interval,
        dynamic_rate_persistence,
        volume_backlog_persistence,
        services,
        request_classes,
        random_access_classes,
    })
}

fn decode_service_level(r: &mut TableReader<'_>) -> Result<ServiceLevel, TableError> {
    let lls_index = nibble(r, "lls_index")?;
    let [random_access, dedicated_access, _] = r.bits(
        1,
        [
            BitField::new("random_access", 0x80),
            BitField::new("dedicated_access", 0x40),
            BitField::new("reserved", 0x3F),
        ],
    )?;
    let mut level = ServiceLevel {
        lls_index,
        random_access: random_access == 1,
        dedicated_access: dedicated_access == 1,
        nominal_rc_index: None,
        nominal_da_ac_index: None,
        conditional_demand_rc_map: None,
        conditional_scheduler_da_ac_map: None,
        nominal_ra_ac_index: None,
        conditional_scheduler_ra_ac_map: None,
    };
    if level.dedicated_access {
        let [rc_index, da_ac_index] = r.bits(
            1,
            [
                BitField::new("nominal_rc_index", 0xF0),
                BitField::new("nominal_da_ac_index", 0x0F),
            ],
        )?;
        level.nominal_rc_index = Some(rc_index as u8);
        level.nominal_da_ac_index = Some(da_ac_index as u8);
        level.conditional_demand_rc_map = Some(r.u16("conditional_demand_rc_map")?);
        level.conditional_scheduler_da_ac_map = Some(r.u16("conditional_scheduler_da_ac_map")?);
    }
    if level.random_access {
        level.nominal_ra_ac_index = Some(nibble(r, "nominal_ra_ac_index")?);
        level.conditional_scheduler_ra_ac_map = Some(r.u16("conditional_scheduler_ra_ac_map")?);
    }
    Ok(level)
}

fn decode_request_class(r: &mut TableReader<'_>) -> Result<RequestClass, TableError> {
    let rc_index = nibble(r, "rc_index")?;
    let [constant, volume, rbdc, _] = r.bits(
        1,
        [
            BitField::new("constant_assignment_provided", 0x80),
            BitField::new("volume_allowed", 0x40),
            BitField::new("rbdc_allowed", 0x20),
            BitField::new("reserved", 0x1F),
        ],
    )?;
    let maximum_service_rate = r.u16("maximum_service_rate")?;
    let minimum_service_rate = r.u16("minimum_service_rate")?;
    let constant_service_rate = if constant == 1 {
        Some(r.u16("constant_service_rate")?)
    } else {
        None
    };
    let maximum_backlog = if volume == 1 {
        Some(r.u8("maximum_backlog")?)
    } else {
        None
    };
    Ok(RequestClass {
        rc_index,
        volume_allowed: volume == 1,
        rbdc_allowed: rbdc == 1,
        maximum_service_rate,
        minimum_service_rate,
        constant_service_rate,
        maximum_backlog,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoftwareVersion {
    pub oui: u32,
    pub version: String,
}

pub(super) fn decode_lowest_software_version(
    r: &mut TableReader<'_>,
) -> Result<Vec<SoftwareVersion>, TableError> {
    let count = r.u8("version_count")?;
    r.counted(
        "software_version",
        u64::from(count),
        layout::SOFTWARE_VERSIONS,
        |r, _| {
            let oui = r.u24("oui")?;
            let len = r.u8("version_length")?;
            let version = r.text("version", usize::from(len))?;
            Ok(SoftwareVersion { oui, version })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::{
        LogonTraffic, decode_logon_initialize, decode_logon_response, decode_lower_layer_service,
        decode_lowest_software_version,
    };
    use crate::protocols::dvb_s2_table::embedded::NoEmbeddedDecoder;
    use crate::protocols::dvb_s2_table::reader::TableReader;

    #[test]
    fn logon_initialize_mpeg_signalling_without_capacity() {
        let data = [
            0x07, // group_id
            0x01, 0x02, // logon_id
            0x10, // security handshake required
            0x70, // capacity_type=1, burst_type=1, connectivity=1
            0xe0, 0x30, // return signalling pid 0x30
            0xe0, 0x31, // forward signalling pid 0x31
        ];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let logon = decode_logon_initialize(&mut reader).unwrap();
        assert!(logon.security_handshake_required);
        assert_eq!(
            logon.traffic,
            LogonTraffic::MpegSignalling {
                return_signalling_pid: 0x30,
                forward_signalling_pid: 0x31
            }
        );
        assert!(logon.capacity.is_none());
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn logon_initialize_atm_return_with_capacity() {
        let data = [
            0x07, 0x01, 0x02, 0x00, 0x00, // capacity_type=0, burst_type=0, connectivity=0
            0x05, 0x00, 0x21, // vpi/vci
            0x00, 0x00, 0x10, // cra_level
            0xf8, 0x20, // vbdc_max = 0x20
            0x00, 0x40, 0x00, 0x08,
        ];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let logon = decode_logon_initialize(&mut reader).unwrap();
        assert_eq!(
            logon.traffic,
            LogonTraffic::AtmReturn {
                return_vpi: 5,
                return_vci: 0x21
            }
        );
        let capacity = logon.capacity.unwrap();
        assert_eq!(capacity.vbdc_max, 0x20);
        assert_eq!(capacity.rbdc_timeout, 8);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn logon_response_reads_mac_entries() {
        let data = [
            0xa4, // keep, power mode 1, access status 1
            0x00, 0x09, 0x00, 0x00, 0x40, 0x12, // assignment ids 1, two macs
            0x18, 0x01, 0x02, 0x03, 0x10, 0x0a, 0x0b, 0x0c,
        ];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let response = decode_logon_response(&mut reader).unwrap();
        assert!(response.keep_identifiers_after_logoff);
        assert_eq!(response.power_control_mode, 1);
        assert_eq!(response.rcst_access_status, 1);
        assert_eq!(response.assignment_id_count, 1);
        assert_eq!(response.unicast_macs.len(), 2);
        assert_eq!(response.unicast_macs[0].prefix_length, 0x18);
        assert_eq!(response.unicast_macs[1].unicast_mac24, 0x0a0b0c);
    }

    #[test]
    fn lower_layer_service_nested_loops() {
        let data = [
            0x01, 0x02, 0x03, // persistence values
            0x01, // one LLS
            0x02, 0xc0, // index 2, random + dedicated
            0x12, 0x00, 0x01, 0x00, 0x02, // dedicated part
            0x03, 0x00, 0x04, // random part
            0x01, // one RC
            0x01, 0xc0, 0x00, 0x10, 0x00, 0x01, 0x00, 0x08, 0x20, // constant + volume
            0x01, // one RA-AC
            0x00, 0x01, 0x02, 0x03, 0x02, 0xaa, 0xbb,
        ];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let service = decode_lower_layer_service(&mut reader).unwrap();
        let level = &service.services[0];
        assert_eq!(level.lls_index, 2);
        assert_eq!(level.nominal_rc_index, Some(1));
        assert_eq!(level.nominal_ra_ac_index, Some(3));
        let rc = &service.request_classes[0];
        assert_eq!(rc.constant_service_rate, Some(8));
        assert_eq!(rc.maximum_backlog, Some(0x20));
        let ra = &service.random_access_classes[0];
        assert_eq!(ra.defaults_for_ra_load_control, vec![0xaa, 0xbb]);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn software_versions_are_text() {
        let data = [0x01, 0x00, 0x10, 0x20, 0x03, b'1', b'.', b'2'];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let versions = decode_lowest_software_version(&mut reader).unwrap();
        assert_eq!(versions[0].oui, 0x001020);
        assert_eq!(versions[0].version, "1.2");
    }
}
