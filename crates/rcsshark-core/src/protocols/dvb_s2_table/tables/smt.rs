use serde::Serialize;

use crate::protocols::dvb_s2_table::error::TableError;
use crate::protocols::dvb_s2_table::layout;
use crate::protocols::dvb_s2_table::reader::TableReader;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnrMonitoringTable {
    pub superframe_sequence: u8,
    pub entries: Vec<LinkQuality>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkQuality {
    pub logon_id: u16,
    /// Hundredths of a dB.
    pub esn0: i16,
    pub modcod: u8,
}

pub(super) fn decode(r: &mut TableReader<'_>) -> Result<SnrMonitoringTable, TableError> {
    let superframe_sequence = r.u8("superframe_sequence")?;
    let count = r.u8("entry_count")?;
    let entries = r.counted("entry", u64::from(count), layout::SMT_ENTRIES, |r, _| {
        let logon_id = r.u16("logon_id")?;
        let esn0 = r.i16("esn0")?;
        r.label_last(format!("{:.2} dB", f64::from(esn0) / 100.0));
        Ok(LinkQuality {
            logon_id,
            esn0,
            modcod: r.u8("modcod")?,
        })
    })?;
    Ok(SnrMonitoringTable {
        superframe_sequence,
        entries,
    })
}
