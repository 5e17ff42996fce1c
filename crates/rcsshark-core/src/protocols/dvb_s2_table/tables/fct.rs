//! Frame composition tables: the RCS timeslot layout and the RCS2
//! time-frequency grid.

use serde::Serialize;

use crate::protocols::dvb_s2_table::error::TableError;
use crate::protocols::dvb_s2_table::layout;
use crate::protocols::dvb_s2_table::reader::{BitField, TableReader};

const SLOT_COUNT_RESERVED: BitField = BitField::new("reserved", 0xF800);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameCompositionTable {
    pub frames: Vec<FrameComposition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameComposition {
    pub frame_id: u8,
    pub frame_duration: u32,
    pub total_timeslot_count: u16,
    pub start_timeslot_number: u16,
    pub timeslots: Vec<Timeslot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timeslot {
    pub frequency_offset: i32,
    pub time_offset: u32,
    pub timeslot_id: u8,
    pub repeat_count: u8,
}

pub(super) fn decode(r: &mut TableReader<'_>) -> Result<FrameCompositionTable, TableError> {
    let raw = r.u8("frame_id_loop_count")?;
    let frames = r.counted("frame", u64::from(raw), layout::FCT_FRAMES, |r, _| {
        let frame_id = r.u8("frame_id")?;
        let frame_duration = r.u32("frame_duration")?;
        let [_, total_timeslot_count] = r.bits(
            2,
            [
                SLOT_COUNT_RESERVED,
                BitField::new("total_timeslot_count", 0x07FF),
            ],
        )?;
        let [_, start_timeslot_number] = r.bits(
            2,
            [
                SLOT_COUNT_RESERVED,
                BitField::new("start_timeslot_number", 0x07FF),
            ],
        )?;
        let raw = r.u8("timeslot_loop_count")?;
        let timeslots = r.counted(
            "timeslot",
            u64::from(raw),
            layout::FCT_TIMESLOTS,
            |r, _| {
                Ok(Timeslot {
                    frequency_offset: r.i24("timeslot_frequency_offset")?,
                    time_offset: r.u32("timeslot_time_offset")?,
                    timeslot_id: r.u8("timeslot_id")?,
                    repeat_count: r.u8("repeat_count")?,
                })
            },
        )?;
        Ok(FrameComposition {
            frame_id,
            frame_duration,
            total_timeslot_count: total_timeslot_count as u16,
            start_timeslot_number: start_timeslot_number as u16,
            timeslots,
        })
    })?;
    Ok(FrameCompositionTable { frames })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameCompositionTable2 {
    pub frame_types: Vec<FrameType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameType {
    pub frame_type: u8,
    pub frame_duration: u32,
    pub btu_duration: u32,
    pub btu_carrier_bw: u32,
    pub btu_symbol_rate: u32,
    pub time_unit_count: u8,
    pub grid_repeat_count: u8,
    pub grid_frequency_offset: u32,
    pub sections: Vec<GridSection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridSection {
    pub default_tx_type: u8,
    pub fixed_access_method: u8,
    pub repeat_count: u16,
}

pub(super) fn decode_fct2(r: &mut TableReader<'_>) -> Result<FrameCompositionTable2, TableError> {
    let raw = r.u8("frame_type_loop_count")?;
    let frame_types = r.counted(
        "frame_type",
        u64::from(raw),
        layout::FCT2_FRAME_TYPES,
        |r, _| {
            let frame_type = r.u8("frame_type")?;
            let frame_duration = r.u32("frame_duration")?;
            let btu_duration = r.u24("btu_duration")?;
            let btu_carrier_bw = r.u24("btu_carrier_bw")?;
            let btu_symbol_rate = r.u24("btu_symbol_rate")?;
            let time_unit_count = r.u8("time_unit_count")?;
            let grid_repeat_count = r.u8("grid_repeat_count")?;
            let grid_frequency_offset = r.u24("grid_frequency_offset")?;
            let raw = r.u8("section_loop_count")?;
            let sections = r.counted("section", u64::from(raw), layout::FCT2_SECTIONS, |r, _| {
                let default_tx_type = r.u8("default_tx_type")?;
                let [method, repeat_count] = r.bits(
                    2,
                    [
                        BitField::new("fixed_access_method", 0xF000),
                        BitField::new("repeat_count", 0x0FFF),
                    ],
                )?;
                Ok(GridSection {
                    default_tx_type,
                    fixed_access_method: method as u8,
                    repeat_count: repeat_count as u16,
                })
            })?;
            Ok(FrameType {
                frame_type,
                frame_duration,
                btu_duration,
                btu_carrier_bw,
                btu_symbol_rate,
                time_unit_count,
                grid_repeat_count,
                grid_frequency_offset,
                sections,
            })
        },
    )?;
    Ok(FrameCompositionTable2 { frame_types })
}

#[cfg(test)]
mod tests {
    use super::{decode, decode_fct2};
    use crate::protocols::dvb_s2_table::embedded::NoEmbeddedDecoder;
    use crate::protocols::dvb_s2_table::reader::TableReader;

    #[test]
    fn fct_frames_and_timeslots() {
        let data = [
            0x00, // one frame
            0x03, 0x00, 0x00, 0x10, 0x00, // id, duration
            0xf8, 0x40, // total timeslots 0x40
            0x00, 0x02, // start timeslot 2
            0x01, // two timeslots
            0xff, 0xff, 0xf6, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, //
            0x00, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x20, 0x02, 0x01,
        ];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let table = decode(&mut reader).unwrap();
        let frame = &table.frames[0];
        assert_eq!(frame.frame_id, 3);
        assert_eq!(frame.total_timeslot_count, 0x40);
        assert_eq!(frame.start_timeslot_number, 2);
        assert_eq!(frame.timeslots.len(), 2);
        assert_eq!(frame.timeslots[0].frequency_offset, -10);
        assert_eq!(frame.timeslots[1].repeat_count, 1);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn fct2_grid_sections() {
        let mut data = vec![0x00, 0x01, 0x00, 0x00, 0x20, 0x00];
        data.extend_from_slice(&[0x00, 0x01, 0x00]); // btu duration
        data.extend_from_slice(&[0x00, 0x02, 0x00]); // btu carrier bw
        data.extend_from_slice(&[0x00, 0x03, 0x00]); // btu symbol rate
        data.extend_from_slice(&[0x04, 0x05]);
        data.extend_from_slice(&[0x00, 0x00, 0x06]);
        data.extend_from_slice(&[0x01, 0x01, 0x10, 0x03, 0x02, 0x20, 0x04]);
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let table = decode_fct2(&mut reader).unwrap();
        let frame_type = &table.frame_types[0];
        assert_eq!(frame_type.time_unit_count, 4);
        assert_eq!(frame_type.sections.len(), 2);
        assert_eq!(frame_type.sections[0].fixed_access_method, 1);
        assert_eq!(frame_type.sections[0].repeat_count, 3);
        assert_eq!(frame_type.sections[1].default_tx_type, 2);
        assert_eq!(reader.remaining(), 0);
    }
}
