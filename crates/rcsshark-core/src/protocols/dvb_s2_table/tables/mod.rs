//! Per-table body decoders. Each one starts right after the common header.

pub mod bct;
pub mod cmt;
pub mod fct;
pub mod mmt2;
pub mod nit;
pub mod pcr;
pub mod sct;
pub mod smt;
pub mod spt;
pub mod tbtp;
pub mod tdt;
pub mod tim;
pub mod tmst;

use serde::Serialize;

use super::error::TableError;
use super::header::TableHeader;
use super::layout::TableKind;
use super::reader::TableReader;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableBody {
    Nit(nit::NetworkInformationTable),
    Rmt(nit::NetworkInformationTable),
    Tdt(tdt::TimeAndDateTable),
    Sct(sct::SuperframeCompositionTable),
    Fct(fct::FrameCompositionTable),
    Spt(spt::SatellitePositionTable),
    Cmt(cmt::CorrectionMessageTable),
    Tbtp(tbtp::TerminalBurstTimePlan),
    Pcr(pcr::PcrInsertionTable),
    Tmst(tmst::TransmissionModeSupportTable),
    Fct2(fct::FrameCompositionTable2),
    Bct(bct::BroadcastConfigurationTable),
    Tbtp2(tbtp::TerminalBurstTimePlan2),
    Tmst2(tmst::TransmissionModeSupportTable),
    Fat(tim::FastAccessTable),
    Tim(tim::TerminalInformation),
    Timb(tim::TerminalInformation),
    Mmt2(mmt2::MulticastMappingTable),
    Smt(smt::SnrMonitoringTable),
}

pub fn decode_body(
    r: &mut TableReader<'_>,
    kind: TableKind,
    header: &TableHeader,
) -> Result<TableBody, TableError> {
    let body = match kind {
        TableKind::Nit => TableBody::Nit(nit::decode(r, kind)?),
        TableKind::Rmt => TableBody::Rmt(nit::decode(r, kind)?),
        TableKind::Tdt => TableBody::Tdt(tdt::decode(r)?),
        TableKind::Sct => TableBody::Sct(sct::decode(r, header.revision)?),
        TableKind::Fct => TableBody::Fct(fct::decode(r)?),
        TableKind::Spt => TableBody::Spt(spt::decode(r)?),
        TableKind::Cmt => TableBody::Cmt(cmt::decode(r)?),
        TableKind::Tbtp => TableBody::Tbtp(tbtp::decode(r)?),
        TableKind::Pcr => TableBody::Pcr(pcr::decode(r)?),
        TableKind::Tmst => TableBody::Tmst(tmst::decode(r, false)?),
        TableKind::Fct2 => TableBody::Fct2(fct::decode_fct2(r)?),
        TableKind::Bct => TableBody::Bct(bct::decode(r)?),
        TableKind::Tbtp2 => TableBody::Tbtp2(tbtp::decode_tbtp2(r)?),
        TableKind::Tmst2 => TableBody::Tmst2(tmst::decode(r, true)?),
        TableKind::Fat => TableBody::Fat(tim::decode_fat(r)?),
        TableKind::Tim => TableBody::Tim(tim::decode_unicast(r)?),
        TableKind::Timb => TableBody::Timb(tim::decode_broadcast(r)?),
        TableKind::Mmt2 => TableBody::Mmt2(mmt2::decode(r)?),
        TableKind::Smt => TableBody::Smt(smt::decode(r)?),
    };
    Ok(body)
}
