use serde::Serialize;

use crate::protocols::dvb_s2_table::config::Revision;
use crate::protocols::dvb_s2_table::error::TableError;
use crate::protocols::dvb_s2_table::layout::{self, polarization_label};
use crate::protocols::dvb_s2_table::reader::{BitField, Ncr, TableReader};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuperframeCompositionTable {
    pub superframes: Vec<Superframe>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Superframe {
    /// `superframe_id` under RCS, `superframe_sequence` under RCS2.
    pub id_or_sequence: u8,
    pub large_timing_uncertainty_flag: bool,
    pub uplink_polarization: u8,
    pub start_time: Ncr,
    pub duration: u32,
    pub centre_frequency: u32,
    pub counter: u16,
    pub frames: Vec<Frame>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Frame {
    /// `frame_id` under RCS, `frame_type` under RCS2.
    pub id_or_type: u8,
    pub start_time: u32,
    pub centre_frequency_offset: i32,
}

pub(super) fn decode(
    r: &mut TableReader<'_>,
    revision: Revision,
) -> Result<SuperframeCompositionTable, TableError> {
    let (superframe_name, frame_name) = match revision {
        Revision::Rcs => ("superframe_id", "frame_id"),
        Revision::Rcs2 => ("superframe_sequence", "frame_type"),
    };
    let raw = r.u8("superframe_loop_count")?;
    let superframes = r.counted(
        "superframe",
        u64::from(raw),
        layout::SCT_SUPERFRAMES,
        |r, _| {
            let id_or_sequence = r.u8(superframe_name)?;
            let [_, uncertainty, polarization] = r.bits(
                1,
                [
                    BitField::new("reserved", 0xF8),
                    BitField::new("large_timing_uncertainty_flag", 0x04),
                    BitField::labeled("uplink_polarization", 0x03, polarization_label),
                ],
            )?;
            let start_time = r.ncr("superframe_start_time")?;
            let duration = r.u32("superframe_duration")?;
            let centre_frequency = r.u32("superframe_centre_frequency")?;
            let counter = r.u16("superframe_counter")?;
            let [_, frame_count] = r.bits(
                1,
                [
                    BitField::new("reserved", 0xE0),
                    BitField::new("frame_loop_count", 0x1F),
                ],
            )?;
            let frames = r.counted("frame", frame_count, layout::SCT_FRAMES, |r, _| {
                Ok(Frame {
                    id_or_type: r.u8(frame_name)?,
                    start_time: r.u32("frame_start_time")?,
                    centre_frequency_offset: r.i24("frame_centre_frequency_offset")?,
                })
            })?;
            Ok(Superframe {
                id_or_sequence,
                large_timing_uncertainty_flag: uncertainty == 1,
                uplink_polarization: polarization as u8,
                start_time,
                duration,
                centre_frequency,
                counter,
                frames,
            })
        },
    )?;
    Ok(SuperframeCompositionTable { superframes })
}

#[cfg(test)]
mod tests {
    use super::decode;
    use crate::protocols::dvb_s2_table::config::Revision;
    use crate::protocols::dvb_s2_table::embedded::NoEmbeddedDecoder;
    use crate::protocols::dvb_s2_table::field::find_field;
    use crate::protocols::dvb_s2_table::reader::TableReader;

    fn superframe(frames: u8) -> Vec<u8> {
        let mut data = vec![
            0x05, // id
            0x05, // uncertainty + polarization 1
            0x00, 0x00, 0x00, 0x00, 0x80, 0x10, // ncr
            0x00, 0x00, 0x10, 0x00, // duration
            0x3b, 0x9a, 0xca, 0x00, // centre frequency
            0x00, 0x07, // counter
            frames,
        ];
        for index in 0..=frames {
            data.extend_from_slice(&[index, 0x00, 0x00, 0x00, 0x40, 0xff, 0xff, 0xff]);
        }
        data
    }

    #[test]
    fn raw_counts_mean_one_more() {
        let mut data = vec![0x01];
        data.extend(superframe(0));
        data.extend(superframe(2));
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let table = decode(&mut reader, Revision::Rcs2).unwrap();
        assert_eq!(table.superframes.len(), 2);
        assert_eq!(table.superframes[0].frames.len(), 1);
        assert_eq!(table.superframes[1].frames.len(), 3);

        let superframe = &table.superframes[0];
        assert!(superframe.large_timing_uncertainty_flag);
        assert_eq!(superframe.uplink_polarization, 1);
        assert_eq!(superframe.start_time.base, 1);
        assert_eq!(superframe.start_time.extension, 0x10);
        assert_eq!(superframe.centre_frequency, 1_000_000_000);
        assert_eq!(superframe.frames[0].centre_frequency_offset, -1);
        assert_eq!(reader.remaining(), 0);

        let fields = reader.finish();
        assert!(find_field(&fields, "superframe_sequence").is_some());
        assert!(find_field(&fields, "superframe_id").is_none());
    }
}
