//! Identifiers, header layouts and loop conventions (source of truth).

use serde::Serialize;

use super::config::Revision;
use super::reader::BitField;

pub const TABLE_NIT: u8 = 0x40;
pub const TABLE_RMT: u8 = 0x41;
pub const TABLE_TDT: u8 = 0x70;
pub const TABLE_SCT: u8 = 0xA0;
pub const TABLE_FCT: u8 = 0xA1;
pub const TABLE_SPT: u8 = 0xA3;
pub const TABLE_CMT: u8 = 0xA4;
pub const TABLE_TBTP: u8 = 0xA5;
pub const TABLE_PCR: u8 = 0xA6;
pub const TABLE_TMST: u8 = 0xAA;
pub const TABLE_FCT2: u8 = 0xAB;
pub const TABLE_BCT: u8 = 0xAC;
pub const TABLE_TBTP2: u8 = 0xAD;
pub const TABLE_TMST2: u8 = 0xAE;
pub const TABLE_FAT: u8 = 0xAF;
pub const TABLE_TIM: u8 = 0xB0;
/// Broadcast TIM. Under RCS it is never on the wire: a TIM whose DSM-CC MAC
/// address is all ones is reclassified to this id before dispatch.
pub const TABLE_TIMB: u8 = 0xB1;
pub const TABLE_MMT2: u8 = 0xB2;
pub const TABLE_SMT: u8 = 0xB3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Nit,
    Rmt,
    Tdt,
    Sct,
    Fct,
    Spt,
    Cmt,
    Tbtp,
    Pcr,
    Tmst,
    Fct2,
    Bct,
    Tbtp2,
    Tmst2,
    Fat,
    Tim,
    Timb,
    Mmt2,
    Smt,
}

impl TableKind {
    pub fn from_id(id: u8) -> Option<Self> {
        let kind = match id {
            TABLE_NIT => TableKind::Nit,
            TABLE_RMT => TableKind::Rmt,
            TABLE_TDT => TableKind::Tdt,
            TABLE_SCT => TableKind::Sct,
            TABLE_FCT => TableKind::Fct,
            TABLE_SPT => TableKind::Spt,
            TABLE_CMT => TableKind::Cmt,
            TABLE_TBTP => TableKind::Tbtp,
            TABLE_PCR => TableKind::Pcr,
            TABLE_TMST => TableKind::Tmst,
            TABLE_FCT2 => TableKind::Fct2,
            TABLE_BCT => TableKind::Bct,
            TABLE_TBTP2 => TableKind::Tbtp2,
            TABLE_TMST2 => TableKind::Tmst2,
            TABLE_FAT => TableKind::Fat,
            TABLE_TIM => TableKind::Tim,
            TABLE_TIMB => TableKind::Timb,
            TABLE_MMT2 => TableKind::Mmt2,
            TABLE_SMT => TableKind::Smt,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            TableKind::Nit => "Network Information Table",
            TableKind::Rmt => "RCS Map Table",
            TableKind::Tdt => "Time and Date Table",
            TableKind::Sct => "Superframe Composition Table",
            TableKind::Fct => "Frame Composition Table",
            TableKind::Spt => "Satellite Position Table",
            TableKind::Cmt => "Correction Message Table",
            TableKind::Tbtp => "Terminal Burst Time Plan",
            TableKind::Pcr => "PCR Insertion Table",
            TableKind::Tmst => "Transmission Mode Support Table",
            TableKind::Fct2 => "Frame Composition Table 2",
            TableKind::Bct => "Broadcast Configuration Table",
            TableKind::Tbtp2 => "Terminal Burst Time Plan 2",
            TableKind::Tmst2 => "Transmission Mode Support Table 2",
            TableKind::Fat => "Fast Access Table",
            TableKind::Tim => "Terminal Information Message (unicast)",
            TableKind::Timb => "Terminal Information Message (broadcast)",
            TableKind::Mmt2 => "Multicast Mapping Table 2",
            TableKind::Smt => "SNR Monitoring Table",
        }
    }

    /// Whether an RCS section of this kind ends in a CRC32 consumed by the
    /// dispatcher. RCS2 tables never carry one.
    pub fn carries_crc(self, revision: Revision) -> bool {
        revision == Revision::Rcs && self != TableKind::Tdt
    }
}

pub fn table_label(id: u64) -> Option<&'static str> {
    u8::try_from(id)
        .ok()
        .and_then(TableKind::from_id)
        .map(TableKind::name)
}

pub const DESC_NETWORK_NAME: u8 = 0x40;
pub const DESC_LINKAGE: u8 = 0x4A;
pub const DESC_NETWORK_LAYER_INFO: u8 = 0xA0;
pub const DESC_CORRECTION_MESSAGE: u8 = 0xA1;
pub const DESC_LOGON_INITIALIZE: u8 = 0xA2;
pub const DESC_ECHO_VALUE: u8 = 0xA6;
pub const DESC_RCS_CONTENT: u8 = 0xA7;
pub const DESC_SATELLITE_FORWARD_LINK: u8 = 0xA8;
pub const DESC_SATELLITE_RETURN_LINK: u8 = 0xA9;
pub const DESC_CONTENTION_CONTROL: u8 = 0xAB;
pub const DESC_CORRECTION_CONTROL: u8 = 0xAC;
pub const DESC_FORWARD_INTERACTION_PATH: u8 = 0xAD;
pub const DESC_RETURN_INTERACTION_PATH: u8 = 0xAE;
pub const DESC_MOBILITY_CONTROL: u8 = 0xB0;
pub const DESC_CORRECTION_MESSAGE_EXTENSION: u8 = 0xB1;
pub const DESC_LOGON_RESPONSE: u8 = 0xB9;
pub const DESC_LOWER_LAYER_SERVICE: u8 = 0xBB;
pub const DESC_LOWEST_SOFTWARE_VERSION: u8 = 0xBD;

pub fn descriptor_label(tag: u64) -> Option<&'static str> {
    let tag = u8::try_from(tag).ok()?;
    let name = match tag {
        DESC_NETWORK_NAME => "network_name_descriptor",
        DESC_LINKAGE => "linkage_descriptor",
        DESC_NETWORK_LAYER_INFO => "network_layer_info_descriptor",
        DESC_CORRECTION_MESSAGE => "correction_message_descriptor",
        DESC_LOGON_INITIALIZE => "logon_initialize_descriptor",
        DESC_ECHO_VALUE => "echo_value_descriptor",
        DESC_RCS_CONTENT => "rcs_content_descriptor",
        DESC_SATELLITE_FORWARD_LINK => "satellite_forward_link_descriptor",
        DESC_SATELLITE_RETURN_LINK => "satellite_return_link_descriptor",
        DESC_CONTENTION_CONTROL => "contention_control_descriptor",
        DESC_CORRECTION_CONTROL => "correction_control_descriptor",
        DESC_FORWARD_INTERACTION_PATH => "forward_interaction_path_descriptor",
        DESC_RETURN_INTERACTION_PATH => "return_interaction_path_descriptor",
        DESC_MOBILITY_CONTROL => "mobility_control_descriptor",
        DESC_CORRECTION_MESSAGE_EXTENSION => "correction_message_extension_descriptor",
        DESC_LOGON_RESPONSE => "logon_response_descriptor",
        DESC_LOWER_LAYER_SERVICE => "lower_layer_service_descriptor",
        DESC_LOWEST_SOFTWARE_VERSION => "lowest_software_version_descriptor",
        _ => return None,
    };
    Some(name)
}

/// Tag and length bytes that open every descriptor, whatever its tag.
pub const DESCRIPTOR_PREFIX_LEN: usize = 2;

pub const SECTION_LENGTH_PREFIX_LEN: usize = 3;
pub const CRC_LEN: usize = 4;
pub const NCR_LEN: usize = 6;

pub const SECTION_SYNTAX_INDICATOR: BitField = BitField::new("section_syntax_indicator", 0x8000);
pub const PRIVATE_INDICATOR: BitField = BitField::new("private_indicator", 0x4000);
pub const SECTION_RESERVED: BitField = BitField::new("reserved", 0x3000);
pub const SECTION_LENGTH: BitField = BitField::new("section_length", 0x0FFF);

pub const VERSION_RESERVED: BitField = BitField::new("reserved", 0xC0);
pub const VERSION_NUMBER: BitField = BitField::new("version_number", 0x3E);
pub const CURRENT_NEXT_INDICATOR: BitField = BitField::new("current_next_indicator", 0x01);

pub const DSMCC_RESERVED: BitField = BitField::new("reserved", 0xC0);
pub const PAYLOAD_SCRAMBLING_CONTROL: BitField =
    BitField::new("payload_scrambling_control", 0x30);
pub const ADDRESS_SCRAMBLING_CONTROL: BitField =
    BitField::new("address_scrambling_control", 0x0C);
pub const LLC_SNAP_FLAG: BitField = BitField::new("llc_snap_flag", 0x02);

pub const NCR_BASE_BITS: u32 = 33;
pub const NCR_EXTENSION_BIT_OFFSET: usize = 39;
pub const NCR_EXTENSION_BITS: u32 = 9;

/// How a count read from the stream maps to a number of loop iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCount {
    /// The field holds one less than the number of entries.
    RawPlusOne,
    /// The field holds the number of entries.
    RawExact,
}

impl LoopCount {
    pub fn iterations(self, raw: u64) -> usize {
        let raw = usize::try_from(raw).unwrap_or(usize::MAX);
        match self {
            LoopCount::RawPlusOne => raw.saturating_add(1),
            LoopCount::RawExact => raw,
        }
    }
}

pub const SCT_SUPERFRAMES: LoopCount = LoopCount::RawPlusOne;
pub const SCT_FRAMES: LoopCount = LoopCount::RawPlusOne;
pub const FCT_FRAMES: LoopCount = LoopCount::RawPlusOne;
pub const FCT_TIMESLOTS: LoopCount = LoopCount::RawPlusOne;
pub const FCT2_FRAME_TYPES: LoopCount = LoopCount::RawPlusOne;
pub const FCT2_SECTIONS: LoopCount = LoopCount::RawPlusOne;
pub const TBTP_FRAMES: LoopCount = LoopCount::RawPlusOne;
pub const TBTP_BTPS: LoopCount = LoopCount::RawPlusOne;
pub const TBTP2_FRAMES: LoopCount = LoopCount::RawPlusOne;
pub const TBTP2_ASSIGNMENTS: LoopCount = LoopCount::RawPlusOne;
pub const CMT_ENTRIES: LoopCount = LoopCount::RawPlusOne;
pub const SPT_SATELLITES: LoopCount = LoopCount::RawPlusOne;
pub const TMST_MODES: LoopCount = LoopCount::RawExact;
pub const SMT_ENTRIES: LoopCount = LoopCount::RawExact;
pub const BCT_TX_TYPES: LoopCount = LoopCount::RawExact;
pub const BCT_UW_SEGMENTS: LoopCount = LoopCount::RawExact;
pub const TIM_DESCRIPTORS: LoopCount = LoopCount::RawExact;
pub const MMT2_MAPPINGS: LoopCount = LoopCount::RawExact;
pub const LINKAGE_POPULATIONS: LoopCount = LoopCount::RawPlusOne;
pub const INTERACTION_PATH_PIDS: LoopCount = LoopCount::RawPlusOne;
pub const ROUTING_LABELS: LoopCount = LoopCount::RawPlusOne;
pub const ROUTING_LABEL_ENTRIES: LoopCount = LoopCount::RawPlusOne;
pub const LOGON_RESPONSE_MACS: LoopCount = LoopCount::RawExact;
pub const LOWER_LAYER_ENTRIES: LoopCount = LoopCount::RawExact;
pub const SOFTWARE_VERSIONS: LoopCount = LoopCount::RawExact;

pub fn polarization_label(value: u64) -> Option<&'static str> {
    match value {
        0 => Some("linear horizontal"),
        1 => Some("linear vertical"),
        2 => Some("circular left"),
        3 => Some("circular right"),
        _ => None,
    }
}

pub fn west_east_label(value: u64) -> Option<&'static str> {
    match value {
        0 => Some("west"),
        1 => Some("east"),
        _ => None,
    }
}

pub fn transmission_standard_label(value: u64) -> Option<&'static str> {
    match value {
        0 => Some("DVB-S"),
        1 => Some("DVB-S2 CCM"),
        2 => Some("DVB-S2 ACM/VCM"),
        3 => Some("reserved"),
        _ => None,
    }
}

pub fn roll_off_label(value: u64) -> Option<&'static str> {
    match value {
        0 => Some("0.35"),
        1 => Some("0.25"),
        2 => Some("0.20"),
        3 => Some("reserved"),
        _ => None,
    }
}

pub fn assignment_type_label(value: u64) -> Option<&'static str> {
    match value {
        0 => Some("one time assignment"),
        1 => Some("repeating assignment"),
        2 => Some("assignment release"),
        3 => Some("reserved"),
        _ => None,
    }
}

pub fn multiplex_usage_label(value: u64) -> Option<&'static str> {
    match value {
        0 => Some("next"),
        1 => Some("logon"),
        2 => Some("control"),
        3 => Some("full"),
        _ => Some("reserved"),
    }
}

pub fn tx_format_class_label(value: u64) -> Option<&'static str> {
    match value {
        1 => Some("linear modulation burst"),
        2 => Some("continuous phase modulation burst"),
        3 => Some("continuous transmission"),
        4 => Some("spread spectrum linear modulation burst"),
        _ => None,
    }
}

pub fn linkage_type_label(value: u64) -> Option<&'static str> {
    match value {
        0x81 => Some("RCS map"),
        0x82 => Some("RCS FLS"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{LoopCount, TableKind, descriptor_label, table_label};
    use crate::protocols::dvb_s2_table::config::Revision;

    #[test]
    fn loop_conventions() {
        assert_eq!(LoopCount::RawPlusOne.iterations(0), 1);
        assert_eq!(LoopCount::RawPlusOne.iterations(255), 256);
        assert_eq!(LoopCount::RawExact.iterations(0), 0);
        assert_eq!(LoopCount::RawExact.iterations(3), 3);
    }

    #[test]
    fn table_ids_round_trip_through_labels() {
        assert_eq!(TableKind::from_id(0x70), Some(TableKind::Tdt));
        assert_eq!(TableKind::from_id(0xB1), Some(TableKind::Timb));
        assert_eq!(TableKind::from_id(0x00), None);
        assert_eq!(table_label(0xA0), Some("Superframe Composition Table"));
        assert_eq!(table_label(0x1_00), None);
        assert_eq!(descriptor_label(0xFE), None);
        assert_eq!(descriptor_label(0xA8), Some("satellite_forward_link_descriptor"));
    }

    #[test]
    fn crc_rule_depends_on_revision() {
        assert!(TableKind::Sct.carries_crc(Revision::Rcs));
        assert!(!TableKind::Tdt.carries_crc(Revision::Rcs));
        assert!(!TableKind::Sct.carries_crc(Revision::Rcs2));
    }
}
