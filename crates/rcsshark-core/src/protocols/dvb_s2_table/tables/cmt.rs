use serde::Serialize;

use crate::protocols::dvb_s2_table::error::TableError;
use crate::protocols::dvb_s2_table::layout;
use crate::protocols::dvb_s2_table::reader::{BitField, TableReader};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectionMessageTable {
    pub entries: Vec<CorrectionEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectionEntry {
    pub group_id: u8,
    pub logon_id: u16,
    pub correction: Correction,
}

/// Timing, power and frequency corrections, each gated by its own flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Correction {
    pub slot_type: u8,
    pub burst_time_scaling: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burst_time_correction: Option<i8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<PowerCorrection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_correction: Option<i16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum PowerCorrection {
    Power(u8),
    Esn0(u8),
}

pub(crate) fn decode_correction(r: &mut TableReader<'_>) -> Result<Correction, TableError> {
    let [time_flag, power_flag, frequency_flag, slot_type, burst_time_scaling] = r.bits(
        1,
        [
            BitField::new("time_correction_flag", 0x80),
            BitField::new("power_correction_flag", 0x40),
            BitField::new("frequency_correction_flag", 0x20),
            BitField::new("slot_type", 0x18),
            BitField::new("burst_time_scaling", 0x07),
        ],
    )?;
    let burst_time_correction = if time_flag == 1 {
        Some(r.i8("burst_time_correction")?)
    } else {
        None
    };
    let power = if power_flag == 1 {
        let [control, value] = r.bits(
            1,
            [
                BitField::new("power_control_flag", 0x80),
                BitField::new("power_correction", 0x7F),
            ],
        )?;
        if control == 1 {
            Some(PowerCorrection::Power(value as u8))
        } else {
            r.label_last("esn0");
            Some(PowerCorrection::Esn0(value as u8))
        }
    } else {
        None
    };
    let frequency_correction = if frequency_flag == 1 {
        Some(r.i16("frequency_correction")?)
    } else {
        None
    };
    Ok(Correction {
        slot_type: slot_type as u8,
        burst_time_scaling: burst_time_scaling as u8,
        burst_time_correction,
        power,
        frequency_correction,
    })
}

pub(super) fn decode(r: &mut TableReader<'_>) -> Result<CorrectionMessageTable, TableError> {
    let raw = r.u8("entry_loop_count")?;
    let entries = r.counted("entry", u64::from(raw), layout::CMT_ENTRIES, |r, _| {
        Ok(CorrectionEntry {
            group_id: r.u8("group_id")?,
            logon_id: r.u16("logon_id")?,
            correction: decode_correction(r)?,
        })
    })?;
    Ok(CorrectionMessageTable { entries })
}

#[cfg(test)]
mod tests {
    use super::{PowerCorrection, decode};
    use crate::protocols::dvb_s2_table::embedded::NoEmbeddedDecoder;
    use crate::protocols::dvb_s2_table::reader::TableReader;

    #[test]
    fn entries_follow_correction_flags() {
        let data = [
            0x01, // two entries
            0x01, 0x00, 0x10, 0xe9, 0xfe, 0x05, 0xff, 0x9c, // all corrections
            0x02, 0x00, 0x11, 0x40, 0x8a, // power only, power control mode
        ];
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let table = decode(&mut reader).unwrap();
        assert_eq!(table.entries.len(), 2);

        let first = &table.entries[0].correction;
        assert_eq!(first.slot_type, 1);
        assert_eq!(first.burst_time_scaling, 1);
        assert_eq!(first.burst_time_correction, Some(-2));
        assert_eq!(first.power, Some(PowerCorrection::Esn0(5)));
        assert_eq!(first.frequency_correction, Some(-100));

        let second = &table.entries[1].correction;
        assert_eq!(second.burst_time_correction, None);
        assert_eq!(second.power, Some(PowerCorrection::Power(0x0a)));
        assert_eq!(reader.remaining(), 0);
    }
}
