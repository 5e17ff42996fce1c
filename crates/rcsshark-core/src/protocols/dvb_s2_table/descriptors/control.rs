use serde::Serialize;

use crate::protocols::dvb_s2_table::error::TableError;
use crate::protocols::dvb_s2_table::reader::TableReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContentionControl {
    pub superframe_id: u8,
    pub csc_response_timeout: u32,
    pub csc_max_losses: u8,
    pub max_time_before_retry: u32,
}

pub(super) fn decode_contention_control(
    r: &mut TableReader<'_>,
) -> Result<ContentionControl, TableError> {
    Ok(ContentionControl {
        superframe_id: r.u8("superframe_id")?,
        csc_response_timeout: r.u32("csc_response_timeout")?,
        csc_max_losses: r.u8("csc_max_losses")?,
        max_time_before_retry: r.u32("max_time_before_retry")?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CorrectionControl {
    pub acq_response_timeout: u32,
    pub sync_response_timeout: u32,
    pub acq_max_losses: u8,
    pub sync_max_losses: u8,
}

pub(super) fn decode_correction_control(
    r: &mut TableReader<'_>,
) -> Result<CorrectionControl, TableError> {
    Ok(CorrectionControl {
        acq_response_timeout: r.u32("acq_response_timeout")?,
        sync_response_timeout: r.u32("sync_response_timeout")?,
        acq_max_losses: r.u8("acq_max_losses")?,
        sync_max_losses: r.u8("sync_max_losses")?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MobilityControl {
    pub command_value: u16,
    pub command_parameter: u16,
}

pub(super) fn decode_mobility_control(
    r: &mut TableReader<'_>,
) -> Result<MobilityControl, TableError> {
    Ok(MobilityControl {
        command_value: r.u16("command_value")?,
        command_parameter: r.u16("command_parameter")?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CorrectionMessageExtension {
    pub frame_number: u8,
    pub burst_start_offset: u16,
}

pub(super) fn decode_correction_message_extension(
    r: &mut TableReader<'_>,
) -> Result<CorrectionMessageExtension, TableError> {
    Ok(CorrectionMessageExtension {
        frame_number: r.u8("frame_number")?,
        burst_start_offset: r.u16("burst_start_offset")?,
    })
}
