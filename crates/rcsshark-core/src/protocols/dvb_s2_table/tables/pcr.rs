use serde::Serialize;

use crate::protocols::dvb_s2_table::error::TableError;
use crate::protocols::dvb_s2_table::reader::{Ncr, TableReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PcrInsertionTable {
    pub pcr: Ncr,
}

pub(super) fn decode(r: &mut TableReader<'_>) -> Result<PcrInsertionTable, TableError> {
    Ok(PcrInsertionTable { pcr: r.ncr("pcr")? })
}
