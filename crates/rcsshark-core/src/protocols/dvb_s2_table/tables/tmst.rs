use serde::Serialize;

use crate::protocols::dvb_s2_table::error::TableError;
use crate::protocols::dvb_s2_table::layout;
use crate::protocols::dvb_s2_table::reader::{BitField, TableReader};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransmissionModeSupportTable {
    pub common_system_margin: u8,
    pub modes: Vec<TransmissionMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransmissionMode {
    pub pilot_symbols: bool,
    pub modcod: u8,
    pub modcod_system_margin: u8,
    pub isi: u8,
}

/// TMST packs the pilot flag and MODCOD into one byte; TMST2 widens the
/// MODCOD to a full byte followed by the flag byte.
pub(super) fn decode(
    r: &mut TableReader<'_>,
    wide_modcod: bool,
) -> Result<TransmissionModeSupportTable, TableError> {
    let common_system_margin = r.u8("common_system_margin")?;
    let count = r.u8("transmission_mode_count")?;
    let modes = r.counted("mode", u64::from(count), layout::TMST_MODES, |r, _| {
        let (pilot_symbols, modcod) = if wide_modcod {
            let modcod = r.u8("modcod")?;
            let [pilot, _] = r.bits(
                1,
                [
                    BitField::new("pilot_symbols", 0x80),
                    BitField::new("reserved", 0x7F),
                ],
            )?;
            (pilot, u64::from(modcod))
        } else {
            let [pilot, _, modcod] = r.bits(
                1,
                [
                    BitField::new("pilot_symbols", 0x80),
                    BitField::new("reserved", 0x60),
                    BitField::new("modcod", 0x1F),
                ],
            )?;
            (pilot, modcod)
        };
        Ok(TransmissionMode {
            pilot_symbols: pilot_symbols == 1,
            modcod: modcod as u8,
            modcod_system_margin: r.u8("modcod_system_margin")?,
            isi: r.u8("isi")?,
        })
    })?;
    Ok(TransmissionModeSupportTable {
        common_system_margin,
        modes,
    })
}
