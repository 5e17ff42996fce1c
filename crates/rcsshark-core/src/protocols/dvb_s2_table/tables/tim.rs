//! Terminal information messages and the fast access table.
//!
//! All three end in a counted descriptor loop. They differ only in the
//! status byte that precedes it.

use serde::Serialize;

use crate::protocols::dvb_s2_table::descriptors::{Descriptor, decode_descriptors};
use crate::protocols::dvb_s2_table::error::TableError;
use crate::protocols::dvb_s2_table::layout::{self, TableKind};
use crate::protocols::dvb_s2_table::reader::{BitField, TableReader};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminalInformation {
    pub status: TerminalStatus,
    pub descriptors: Vec<Descriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminalStatus {
    Unicast {
        id_encrypt: bool,
        logon_fail_busy: bool,
        logon_denied: bool,
        log_off: bool,
        transmit_disable: bool,
        rain_fade_release: bool,
        rain_fade_detect: bool,
    },
    Broadcast {
        link_failure_recovery: bool,
        ncc_receive_fail: bool,
        return_link_failure: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FastAccessTable {
    pub descriptors: Vec<Descriptor>,
}

pub(super) fn decode_unicast(r: &mut TableReader<'_>) -> Result<TerminalInformation, TableError> {
    let [_, id_encrypt, busy, denied, log_off, disable, release, detect] = r.bits(
        1,
        [
            BitField::new("reserved", 0x80),
            BitField::new("id_encrypt", 0x40),
            BitField::new("logon_fail_busy", 0x20),
            BitField::new("logon_denied", 0x10),
            BitField::new("log_off", 0x08),
            BitField::new("transmit_disable", 0x04),
            BitField::new("rain_fade_release", 0x02),
            BitField::new("rain_fade_detect", 0x01),
        ],
    )?;
    let status = TerminalStatus::Unicast {
        id_encrypt: id_encrypt == 1,
        logon_fail_busy: busy == 1,
        logon_denied: denied == 1,
        log_off: log_off == 1,
        transmit_disable: disable == 1,
        rain_fade_release: release == 1,
        rain_fade_detect: detect == 1,
    };
    let descriptors = descriptor_loop(r, TableKind::Tim)?;
    Ok(TerminalInformation {
        status,
        descriptors,
    })
}

pub(super) fn decode_broadcast(
    r: &mut TableReader<'_>,
) -> Result<TerminalInformation, TableError> {
    let [_, recovery, ncc_fail, return_fail] = r.bits(
        1,
        [
            BitField::new("reserved", 0xF8),
            BitField::new("link_failure_recovery", 0x04),
            BitField::new("ncc_receive_fail", 0x02),
            BitField::new("return_link_failure", 0x01),
        ],
    )?;
    let status = TerminalStatus::Broadcast {
        link_failure_recovery: recovery == 1,
        ncc_receive_fail: ncc_fail == 1,
        return_link_failure: return_fail == 1,
    };
    let descriptors = descriptor_loop(r, TableKind::Timb)?;
    Ok(TerminalInformation {
        status,
        descriptors,
    })
}

pub(super) fn decode_fat(r: &mut TableReader<'_>) -> Result<FastAccessTable, TableError> {
    Ok(FastAccessTable {
        descriptors: descriptor_loop(r, TableKind::Fat)?,
    })
}

fn descriptor_loop(
    r: &mut TableReader<'_>,
    table: TableKind,
) -> Result<Vec<Descriptor>, TableError> {
    let raw = r.u8("descriptor_loop_count")?;
    let count = layout::TIM_DESCRIPTORS.iterations(u64::from(raw));
    decode_descriptors(r, count, table)
}
