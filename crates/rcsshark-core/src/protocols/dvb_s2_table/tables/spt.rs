use serde::Serialize;

use crate::protocols::dvb_s2_table::error::TableError;
use crate::protocols::dvb_s2_table::layout;
use crate::protocols::dvb_s2_table::reader::TableReader;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatellitePositionTable {
    pub satellites: Vec<SatellitePosition>,
}

/// Earth-centred coordinates in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SatellitePosition {
    pub satellite_id: u8,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

pub(super) fn decode(r: &mut TableReader<'_>) -> Result<SatellitePositionTable, TableError> {
    let raw = r.u8("satellite_loop_count")?;
    let satellites = r.counted(
        "satellite",
        u64::from(raw),
        layout::SPT_SATELLITES,
        |r, _| {
            Ok(SatellitePosition {
                satellite_id: r.u8("satellite_id")?,
                x: r.f32("x_coordinate")?,
                y: r.f32("y_coordinate")?,
                z: r.f32("z_coordinate")?,
            })
        },
    )?;
    Ok(SatellitePositionTable { satellites })
}

#[cfg(test)]
mod tests {
    use super::decode;
    use crate::protocols::dvb_s2_table::embedded::NoEmbeddedDecoder;
    use crate::protocols::dvb_s2_table::reader::TableReader;

    #[test]
    fn coordinates_are_ieee_floats() {
        let mut data = vec![0x00, 0x13];
        data.extend_from_slice(&42_164_000.0f32.to_be_bytes());
        data.extend_from_slice(&(-1.5f32).to_be_bytes());
        data.extend_from_slice(&0.0f32.to_be_bytes());
        let mut reader = TableReader::new(&data, &NoEmbeddedDecoder);
        let table = decode(&mut reader).unwrap();
        let satellite = table.satellites[0];
        assert_eq!(satellite.satellite_id, 0x13);
        assert_eq!(satellite.x, 42_164_000.0);
        assert_eq!(satellite.y, -1.5);
        assert_eq!(reader.remaining(), 0);
    }
}
