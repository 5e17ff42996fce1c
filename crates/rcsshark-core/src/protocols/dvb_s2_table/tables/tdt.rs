use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::{Date, PrimitiveDateTime, Time};

use crate::protocols::dvb_s2_table::error::TableError;
use crate::protocols::dvb_s2_table::reader::TableReader;

/// Julian day number of MJD 0 (1858-11-17).
const MJD_EPOCH_JULIAN_DAY: i32 = 2_400_001;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeAndDateTable {
    /// Modified Julian Date.
    pub date: u16,
    /// BCD-coded as on the wire.
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// RFC 3339 timestamp, when every component is valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc: Option<String>,
}

pub(super) fn decode(r: &mut TableReader<'_>) -> Result<TimeAndDateTable, TableError> {
    let date = r.u16("date")?;
    let calendar = mjd_to_date(date);
    if let Some(calendar) = calendar {
        r.label_last(calendar.to_string());
    }
    let hour = bcd_field(r, "hour")?;
    let minute = bcd_field(r, "minute")?;
    let second = bcd_field(r, "second")?;

    let utc = calendar.and_then(|calendar| {
        let time = Time::from_hms(bcd(hour)?, bcd(minute)?, bcd(second)?).ok()?;
        PrimitiveDateTime::new(calendar, time)
            .assume_utc()
            .format(&Rfc3339)
            .ok()
    });
    Ok(TimeAndDateTable {
        date,
        hour,
        minute,
        second,
        utc,
    })
}

fn bcd_field(r: &mut TableReader<'_>, name: &'static str) -> Result<u8, TableError> {
    let raw = r.u8(name)?;
    if let Some(value) = bcd(raw) {
        r.label_last(format!("{value:02}"));
    }
    Ok(raw)
}

fn bcd(raw: u8) -> Option<u8> {
    let (tens, units) = (raw >> 4, raw & 0x0F);
    if tens > 9 || units > 9 {
        return None;
    }
    Some(tens * 10 + units)
}

fn mjd_to_date(mjd: u16) -> Option<Date> {
    Date::from_julian_day(i32::from(mjd) + MJD_EPOCH_JULIAN_DAY).ok()
}
