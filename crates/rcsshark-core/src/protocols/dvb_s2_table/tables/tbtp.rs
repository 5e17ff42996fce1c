//! Terminal burst time plans.

use serde::Serialize;

use crate::protocols::dvb_s2_table::error::TableError;
use crate::protocols::dvb_s2_table::layout::{self, assignment_type_label};
use crate::protocols::dvb_s2_table::reader::{BitField, TableReader};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminalBurstTimePlan {
    pub group_id: u8,
    pub superframe_count: u16,
    pub frames: Vec<TbtpFrame>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TbtpFrame {
    pub frame_number: u8,
    pub burst_time_plans: Vec<BurstTimePlan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BurstTimePlan {
    pub logon_id: u16,
    pub multiple_channels_flag: bool,
    pub assignment_type: u8,
    pub vbdc_queue_empty_flag: bool,
    pub start_slot: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<u8>,
    pub assignment_count: u8,
}

pub(super) fn decode(r: &mut TableReader<'_>) -> Result<TerminalBurstTimePlan, TableError> {
    let group_id = r.u8("group_id")?;
    let superframe_count = r.u16("superframe_count")?;
    let raw = r.u8("frame_loop_count")?;
    let frames = r.counted("frame", u64::from(raw), layout::TBTP_FRAMES, |r, _| {
        let frame_number = r.u8("frame_number")?;
        let [_, btp_count] = r.bits(
            2,
            [
                BitField::new("reserved", 0xF800),
                BitField::new("btp_loop_count", 0x07FF),
            ],
        )?;
        let burst_time_plans = r.counted("btp", btp_count, layout::TBTP_BTPS, |r, _| {
            decode_btp(r)
        })?;
        Ok(TbtpFrame {
            frame_number,
            burst_time_plans,
        })
    })?;
    Ok(TerminalBurstTimePlan {
        group_id,
        superframe_count,
        frames,
    })
}

fn decode_btp(r: &mut TableReader<'_>) -> Result<BurstTimePlan, TableError> {
    let logon_id = r.u16("logon_id")?;
    let [multiple_channels, assignment_type, vbdc_queue_empty, start_slot] = r.bits(
        2,
        [
            BitField::new("multiple_channels_flag", 0x8000),
            BitField::labeled("assignment_type", 0x6000, assignment_type_label),
            BitField::new("vbdc_queue_empty_flag", 0x1000),
            BitField::new("start_slot", 0x0FFF),
        ],
    )?;
    let channel_id = if multiple_channels == 1 {
        Some(r.u8("channel_id")?)
    } else {
        None
    };
    Ok(BurstTimePlan {
        logon_id,
        multiple_channels_flag: multiple_channels == 1,
        assignment_type: assignment_type as u8,
        vbdc_queue_empty_flag: vbdc_queue_empty == 1,
        start_slot: start_slot as u16,
        channel_id,
        assignment_count: r.u8("assignment_count")?,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminalBurstTimePlan2 {
    pub superframe_sequence: u8,
    pub assignment_context: u8,
    pub superframe_count: u8,
    pub assignment_format: u8,
    pub frames: Vec<Tbtp2Frame>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tbtp2Frame {
    pub frame_number: u8,
    pub assignment_offset: u16,
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Assignment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_tx_type: Option<u8>,
    pub assignment_id: u64,
}

/// Shape of one TBTP2 assignment entry, fixed for the whole table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AssignmentFormat {
    dynamic_tx_type: bool,
    id_width: usize,
}

impl AssignmentFormat {
    fn from_raw(raw: u8) -> Option<Self> {
        let (dynamic_tx_type, id_width) = match raw {
            0 => (false, 6),
            1 => (false, 1),
            2 => (false, 2),
            3 => (false, 3),
            10 => (true, 2),
            11 => (true, 3),
            _ => return None,
        };
        Some(Self {
            dynamic_tx_type,
            id_width,
        })
    }
}

pub(super) fn decode_tbtp2(r: &mut TableReader<'_>) -> Result<TerminalBurstTimePlan2, TableError> {
    let superframe_sequence = r.u8("superframe_sequence")?;
    let assignment_context = r.u8("assignment_context")?;
    let superframe_count = r.u8("superframe_count")?;
    let format_offset = r.offset();
    let assignment_format = r.u8("assignment_format")?;
    let format =
        AssignmentFormat::from_raw(assignment_format).ok_or(TableError::InvalidValue {
            field: "assignment_format",
            value: u64::from(assignment_format),
            offset: format_offset,
        })?;

    let raw = r.u8("frame_assignment_loop_count")?;
    let frames = r.counted("frame", u64::from(raw), layout::TBTP2_FRAMES, |r, _| {
        let frame_number = r.u8("frame_number")?;
        let assignment_offset = r.u16("assignment_offset")?;
        let raw = r.u16("assignment_loop_count")?;
        let assignments = r.counted(
            "assignment",
            u64::from(raw),
            layout::TBTP2_ASSIGNMENTS,
            |r, _| {
                let dynamic_tx_type = if format.dynamic_tx_type {
                    Some(r.u8("dynamic_tx_type")?)
                } else {
                    None
                };
                Ok(Assignment {
                    dynamic_tx_type,
                    assignment_id: r.uint("assignment_id", format.id_width)?,
                })
            },
        )?;
        Ok(Tbtp2Frame {
            frame_number,
            assignment_offset,
            assignments,
        })
    })?;

    Ok(TerminalBurstTimePlan2 {
        superframe_sequence,
        assignment_context,
        superframe_count,
        assignment_format,
        frames,
    })
}

#[cfg(test)]
mod tests {
    use super::{decode, decode_tbtp2};
    use crate::protocols::dvb_s2_table::embedded::NoEmbeddedDecoder;
    use crate::protocols::dvb_s2_table::error::TableError;
    use crate::protocols::dvb_s2_table::reader::TableReader;

    #[test]
    fn channel_id_only_with_multiple_channels() {
        let data = [
            0x01, 0x00, 0x02, // group, superframe count
            0x00, // one frame
            0x04, 0x00, 0x01, // frame number, two btps
            0x00, 0x10, 0xa0, 0x05, 0x07, 0x02, // multiple channels, channel 7
            0x00, 0x11, 0x10, 0x06, 0x01,
        ];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let table = decode(&mut reader).unwrap();
        let btps = &table.frames[0].burst_time_plans;
        assert_eq!(btps.len(), 2);
        assert_eq!(btps[0].channel_id, Some(7));
        assert_eq!(btps[0].assignment_type, 1);
        assert_eq!(btps[0].start_slot, 5);
        assert_eq!(btps[1].channel_id, None);
        assert!(btps[1].vbdc_queue_empty_flag);
        assert_eq!(btps[1].assignment_count, 1);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn dynamic_format_prepends_tx_type() {
        let data = [
            0x01, 0x02, 0x03, 0x0b, // format 11
            0x00, // one frame
            0x00, 0x00, 0x10, 0x00, 0x01, // two assignments
            0x80, 0x00, 0x00, 0x01, 0x81, 0x00, 0x00, 0x02,
        ];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let table = decode_tbtp2(&mut reader).unwrap();
        let assignments = &table.frames[0].assignments;
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[1].dynamic_tx_type, Some(0x81));
        assert_eq!(assignments[1].assignment_id, 2);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn unsupported_format_is_invalid_value() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x00];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let err = decode_tbtp2(&mut reader).unwrap_err();
        assert_eq!(
            err,
            TableError::InvalidValue {
                field: "assignment_format",
                value: 4,
                offset: 3
            }
        );
    }
}
