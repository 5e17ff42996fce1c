//! Descriptors that describe links, paths and network topology.

use serde::Serialize;

use crate::protocols::dvb_s2_table::error::TableError;
use crate::protocols::dvb_s2_table::layout::{
    self, linkage_type_label, multiplex_usage_label, polarization_label, roll_off_label,
    table_label, transmission_standard_label, west_east_label,
};
use crate::protocols::dvb_s2_table::reader::{BitField, Ncr, TableReader};

const LINKAGE_RCS_MAP: u8 = 0x81;

const STANDARD_DVB_S: u64 = 0;
const STANDARD_DVB_S2_CCM: u64 = 1;
const STANDARD_DVB_S2_ACM_VCM: u64 = 2;

const PID: BitField = BitField::new("pid", 0x1FFF);
const PID_RESERVED: BitField = BitField::new("reserved", 0xE000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Linkage {
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub service_id: u16,
    pub linkage_type: u8,
    pub detail: LinkageDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkageDetail {
    RcsMap { populations: Vec<Population> },
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Population {
    pub base: u16,
    pub mask: u16,
}

pub(super) fn decode_linkage(r: &mut TableReader<'_>) -> Result<Linkage, TableError> {
    let transport_stream_id = r.u16("transport_stream_id")?;
    let original_network_id = r.u16("original_network_id")?;
    let service_id = r.u16("service_id")?;
    let linkage_type = r.enumerated("linkage_type", 1, linkage_type_label)? as u8;
    let detail = if linkage_type == LINKAGE_RCS_MAP {
        let raw = r.u8("population_id_loop_count")?;
        let populations = r.counted(
            "population",
            u64::from(raw),
            layout::LINKAGE_POPULATIONS,
            |r, _| {
                Ok(Population {
                    base: r.u16("population_id_base")?,
                    mask: r.u16("population_id_mask")?,
                })
            },
        )?;
        LinkageDetail::RcsMap { populations }
    } else {
        LinkageDetail::Other
    };
    Ok(Linkage {
        transport_stream_id,
        original_network_id,
        service_id,
        linkage_type,
        detail,
    })
}

pub(super) fn decode_rcs_content(r: &mut TableReader<'_>, end: usize) -> Result<Vec<u8>, TableError> {
    let mut table_ids = Vec::new();
    while r.offset() < end {
        table_ids.push(r.enumerated("table_id", 1, table_label)? as u8);
    }
    Ok(table_ids)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SatelliteForwardLink {
    pub satellite_id: u8,
    pub beam_id: u16,
    pub ncc_id: u8,
    pub multiplex_usage: u8,
    pub local_multiplex_id: u8,
    pub frequency: u32,
    pub orbital_position: u16,
    pub west_east_flag: bool,
    pub polarization: u8,
    pub scrambling_sequence_selector: bool,
    pub roll_off: u8,
    pub symbol_rate: u32,
    pub transmission: ForwardTransmission,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrambling_sequence_index: Option<u32>,
    /// Only present in a broadcast TIM.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ncr: Option<Ncr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "standard", rename_all = "snake_case")]
pub enum ForwardTransmission {
    DvbS { inner_fec: u8 },
    DvbS2Ccm { input_stream_identifier: u8 },
    DvbS2AcmVcm,
    Reserved,
}

pub(super) fn decode_satellite_forward_link(
    r: &mut TableReader<'_>,
) -> Result<SatelliteForwardLink, TableError> {
    let satellite_id = r.u8("satellite_id")?;
    let beam_id = r.u16("beam_id")?;
    let ncc_id = r.u8("ncc_id")?;
    let [multiplex_usage, local_multiplex_id] = r.bits(
        1,
        [
            BitField::labeled("multiplex_usage", 0xE0, multiplex_usage_label),
            BitField::new("local_multiplex_id", 0x1F),
        ],
    )?;
    let frequency = r.u32("frequency")?;
    let orbital_position = r.u16("orbital_position")?;
    let [west_east, polarization, standard, selector, roll_off] = r.bits(
        1,
        [
            BitField::labeled("west_east_flag", 0x80, west_east_label),
            BitField::labeled("polarization", 0x60, polarization_label),
            BitField::labeled("transmission_standard", 0x18, transmission_standard_label),
            BitField::new("scrambling_sequence_selector", 0x04),
            BitField::labeled("roll_off", 0x03, roll_off_label),
        ],
    )?;
    let symbol_rate = r.u24("symbol_rate")?;

    let transmission = match standard {
        STANDARD_DVB_S => {
            let [_, inner_fec] = r.bits(
                1,
                [
                    BitField::new("reserved", 0xF0),
                    BitField::new("inner_fec", 0x0F),
                ],
            )?;
            ForwardTransmission::DvbS {
                inner_fec: inner_fec as u8,
            }
        }
        STANDARD_DVB_S2_CCM => ForwardTransmission::DvbS2Ccm {
            input_stream_identifier: r.u8("input_stream_identifier")?,
        },
        STANDARD_DVB_S2_ACM_VCM => ForwardTransmission::DvbS2AcmVcm,
        _ => ForwardTransmission::Reserved,
    };

    let scrambled = matches!(standard, STANDARD_DVB_S2_CCM | STANDARD_DVB_S2_ACM_VCM);
    let scrambling_sequence_index = if scrambled && selector == 0 {
        let [_, index] = r.bits(
            3,
            [
                BitField::new("reserved", 0xFC_0000),
                BitField::new("scrambling_sequence_index", 0x03_FFFF),
            ],
        )?;
        Some(index as u32)
    } else {
        None
    };

    Ok(SatelliteForwardLink {
        satellite_id,
        beam_id,
        ncc_id,
        multiplex_usage: multiplex_usage as u8,
        local_multiplex_id: local_multiplex_id as u8,
        frequency,
        orbital_position,
        west_east_flag: west_east == 1,
        polarization: polarization as u8,
        scrambling_sequence_selector: selector == 1,
        roll_off: roll_off as u8,
        symbol_rate,
        transmission,
        scrambling_sequence_index,
        ncr: None,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SatelliteReturnLink {
    pub satellite_id: u8,
    pub beam_id: u16,
    pub gateway_id: u8,
    pub orbital_position: u16,
    pub west_east_flag: bool,
    pub superframe_sequence: u8,
    pub tx_frequency_offset: u32,
    pub zero_frequency_offset: u32,
}

pub(super) fn decode_satellite_return_link(
    r: &mut TableReader<'_>,
) -> Result<SatelliteReturnLink, TableError> {
    let satellite_id = r.u8("satellite_id")?;
    let beam_id = r.u16("beam_id")?;
    let gateway_id = r.u8("gateway_id")?;
    r.u8("reserved")?;
    let orbital_position = r.u16("orbital_position")?;
    let [west_east, _] = r.bits(
        1,
        [
            BitField::labeled("west_east_flag", 0x80, west_east_label),
            BitField::new("reserved", 0x7F),
        ],
    )?;
    Ok(SatelliteReturnLink {
        satellite_id,
        beam_id,
        gateway_id,
        orbital_position,
        west_east_flag: west_east == 1,
        superframe_sequence: r.u8("superframe_sequence")?,
        tx_frequency_offset: r.u24("tx_frequency_offset")?,
        zero_frequency_offset: r.u24("zero_frequency_offset")?,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardInteractionPath {
    pub original_network_id: u16,
    pub transport_stream_id: u16,
    pub pids: Vec<u16>,
}

pub(super) fn decode_forward_interaction_path(
    r: &mut TableReader<'_>,
    end: usize,
) -> Result<Vec<ForwardInteractionPath>, TableError> {
    r.until("path", end, |r| {
        let original_network_id = r.u16("original_network_id")?;
        let transport_stream_id = r.u16("transport_stream_id")?;
        let pids = decode_pid_loop(r)?;
        Ok(ForwardInteractionPath {
            original_network_id,
            transport_stream_id,
            pids,
        })
    })
}

fn decode_pid_loop(r: &mut TableReader<'_>) -> Result<Vec<u16>, TableError> {
    let raw = r.u8("pid_loop_count")?;
    r.counted("pid", u64::from(raw), layout::INTERACTION_PATH_PIDS, |r, _| {
        let [_, pid] = r.bits(2, [PID_RESERVED, PID])?;
        Ok(pid as u16)
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnInteractionPath {
    pub labels: Vec<RoutingLabel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingLabel {
    pub allocation_desallocation_flag: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pids: Option<Vec<u16>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpi_vci: Option<Vec<VpiVci>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_ids: Option<Vec<u16>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VpiVci {
    pub vpi: u8,
    pub vci: u16,
}

pub(super) fn decode_return_interaction_path(
    r: &mut TableReader<'_>,
) -> Result<ReturnInteractionPath, TableError> {
    let raw = r.u8("network_routing_label_loop_count")?;
    let labels = r.counted(
        "network_routing_label",
        u64::from(raw),
        layout::ROUTING_LABELS,
        |r, _| decode_routing_label(r),
    )?;
    Ok(ReturnInteractionPath { labels })
}

fn decode_routing_label(r: &mut TableReader<'_>) -> Result<RoutingLabel, TableError> {
    let [allocation, pid_flag, vpi_vci_flag, route_id_flag, channel_id_flag, _] = r.bits(
        1,
        [
            BitField::new("allocation_desallocation_flag", 0x80),
            BitField::new("pid_flag", 0x40),
            BitField::new("vpi_vci_flag", 0x20),
            BitField::new("route_id_flag", 0x10),
            BitField::new("channel_id_flag", 0x08),
            BitField::new("reserved", 0x07),
        ],
    )?;

    let pids = if pid_flag == 1 {
        Some(decode_pid_loop(r)?)
    } else {
        None
    };
    let vpi_vci = if vpi_vci_flag == 1 {
        let raw = r.u8("vpi_vci_loop_count")?;
        Some(r.counted(
            "vpi_vci",
            u64::from(raw),
            layout::ROUTING_LABEL_ENTRIES,
            |r, _| {
                Ok(VpiVci {
                    vpi: r.u8("vpi")?,
                    vci: r.u16("vci")?,
                })
            },
        )?)
    } else {
        None
    };
    let route_ids = if route_id_flag == 1 {
        let raw = r.u8("route_id_loop_count")?;
        Some(r.counted(
            "route",
            u64::from(raw),
            layout::ROUTING_LABEL_ENTRIES,
            |r, _| r.u16("route_id"),
        )?)
    } else {
        None
    };
    let channel_id = if channel_id_flag == 1 {
        let [_, channel] = r.bits(
            1,
            [
                BitField::new("reserved", 0xF0),
                BitField::new("channel_id", 0x0F),
            ],
        )?;
        Some(channel as u8)
    } else {
        None
    };

    Ok(RoutingLabel {
        allocation_desallocation_flag: allocation == 1,
        pids,
        vpi_vci,
        route_ids,
        channel_id,
    })
}
