//! Broadcast configuration table.
//!
//! Each transmission type carries a format block whose layout depends on the
//! format class and on whether the type is predefined (`tx_type <= 127`,
//! a reference to a standard waveform) or custom.

use serde::Serialize;

use crate::protocols::dvb_s2_table::error::TableError;
use crate::protocols::dvb_s2_table::layout::{self, roll_off_label, tx_format_class_label};
use crate::protocols::dvb_s2_table::reader::{BitField, TableReader};

const LAST_PREDEFINED_TX_TYPE: u8 = 127;

const CLASS_LINEAR_MODULATION: u8 = 1;
const CLASS_CONTINUOUS_PHASE: u8 = 2;
const CLASS_CONTINUOUS: u8 = 3;
const CLASS_SPREAD_SPECTRUM: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastConfigurationTable {
    pub tx_types: Vec<TxTypeEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxTypeEntry {
    pub tx_type: u8,
    pub tx_content_type: u8,
    pub tx_format_class: u8,
    pub tx_format_data_length: u8,
    pub format: TxFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum TxFormat {
    LinearModulationBurst { waveform: LinearWaveform },
    ContinuousPhaseBurst { waveform: CpmWaveform },
    Continuous(ContinuousCarrier),
    SpreadSpectrum { spreading_factor: u8, waveform_id: u8 },
    Unknown { data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearWaveform {
    Reference { waveform_id: u8 },
    Custom(CustomLinearBurst),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomLinearBurst {
    pub payload_size: u16,
    pub modulation_scheme: u8,
    pub p: u8,
    pub q: [u8; 4],
    pub y_period: u8,
    pub w_period: u8,
    pub y_pattern: u8,
    pub w_pattern: u8,
    pub preamble_length: u8,
    pub preamble_symbols: Vec<u8>,
    pub postamble_length: u8,
    pub postamble_symbols: Vec<u8>,
    pub pilot_period: u8,
    pub pilot_block_length: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CpmWaveform {
    Reference { waveform_id: u8 },
    Custom(CustomCpmBurst),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomCpmBurst {
    pub alphabet_size: u8,
    pub modulation_index: u8,
    pub pulse_shape: u8,
    pub code_rate: u8,
    pub constraint_length: u8,
    pub uw_length: u8,
    pub uw_segments: Vec<UniqueWordSegment>,
    pub interleaver: Interleaver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UniqueWordSegment {
    pub start: u16,
    pub length: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Interleaver {
    Parameterized { n: u16, s: u8, p0: u16, p1: u16 },
    /// Explicit permutation filling the rest of the format block.
    Permutation { pi_i: Vec<u8> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContinuousCarrier {
    pub modcod: u8,
    pub roll_off: u8,
    pub symbol_rate: u32,
}

pub(super) fn decode(r: &mut TableReader<'_>) -> Result<BroadcastConfigurationTable, TableError> {
    let count = r.u8("tx_type_loop_count")?;
    let tx_types = r.counted(
        "tx_type_entry",
        u64::from(count),
        layout::BCT_TX_TYPES,
        |r, _| decode_entry(r),
    )?;
    Ok(BroadcastConfigurationTable { tx_types })
}

fn decode_entry(r: &mut TableReader<'_>) -> Result<TxTypeEntry, TableError> {
    let tx_type = r.u8("tx_type")?;
    let tx_content_type = r.u8("tx_content_type")?;
    let tx_format_class = r.enumerated("tx_format_class", 1, tx_format_class_label)? as u8;
    let tx_format_data_length = r.u8("tx_format_data_length")?;
    let declared = usize::from(tx_format_data_length);
    let start = r.offset();
    let end = start + declared;
    let custom = tx_type > LAST_PREDEFINED_TX_TYPE;

    let format = r.group("tx_format_data", |r| {
        r.limited(
            end,
            |r| decode_format(r, tx_format_class, custom, declared, end),
            |reached| TableError::MalformedRegion {
                region: "tx format data",
                declared,
                consumed: reached - start,
                offset: start,
            },
        )
    })?;

    let consumed = r.offset() - start;
    let private_data = r.private_data(declared - consumed)?.map(<[u8]>::to_vec);
    Ok(TxTypeEntry {
        tx_type,
        tx_content_type,
        tx_format_class,
        tx_format_data_length,
        format,
        private_data,
    })
}

fn decode_format(
    r: &mut TableReader<'_>,
    tx_format_class: u8,
    custom: bool,
    declared: usize,
    end: usize,
) -> Result<TxFormat, TableError> {
    match tx_format_class {
        CLASS_LINEAR_MODULATION => {
            let waveform = if custom {
                LinearWaveform::Custom(decode_custom_linear(r)?)
            } else {
                LinearWaveform::Reference {
                    waveform_id: r.u8("waveform_id")?,
                }
            };
            Ok(TxFormat::LinearModulationBurst { waveform })
        }
        CLASS_CONTINUOUS_PHASE => {
            let waveform = if custom {
                CpmWaveform::Custom(decode_custom_cpm(r, end)?)
            } else {
                CpmWaveform::Reference {
                    waveform_id: r.u8("waveform_id")?,
                }
            };
            Ok(TxFormat::ContinuousPhaseBurst { waveform })
        }
        CLASS_CONTINUOUS => {
            let modcod = r.u8("modcod")?;
            let [_, roll_off] = r.bits(
                1,
                [
                    BitField::new("reserved", 0xFC),
                    BitField::labeled("roll_off", 0x03, roll_off_label),
                ],
            )?;
            Ok(TxFormat::Continuous(ContinuousCarrier {
                modcod,
                roll_off: roll_off as u8,
                symbol_rate: r.u24("symbol_rate")?,
            }))
        }
        CLASS_SPREAD_SPECTRUM => Ok(TxFormat::SpreadSpectrum {
            spreading_factor: r.u8("spreading_factor")?,
            waveform_id: r.u8("waveform_id")?,
        }),
        _ => {
            log::debug!("tx format class {tx_format_class} kept as {declared} raw bytes");
            Ok(TxFormat::Unknown {
                data: r.bytes("data", declared)?.to_vec(),
            })
        }
    }
}

fn decode_custom_linear(r: &mut TableReader<'_>) -> Result<CustomLinearBurst, TableError> {
    let payload_size = r.u16("payload_size")?;
    let modulation_scheme = r.u8("modulation_scheme")?;
    let p = r.u8("p")?;
    let q = [r.u8("q0")?, r.u8("q1")?, r.u8("q2")?, r.u8("q3")?];
    let y_period = r.u8("y_period")?;
    let w_period = r.u8("w_period")?;
    let y_pattern = r.u8("y_pattern")?;
    let w_pattern = r.u8("w_pattern")?;
    let preamble_length = r.u8("preamble_length")?;
    let preamble_symbols = symbols(r, "preamble_symbols", preamble_length)?;
    let postamble_length = r.u8("postamble_length")?;
    let postamble_symbols = symbols(r, "postamble_symbols", postamble_length)?;
    Ok(CustomLinearBurst {
        payload_size,
        modulation_scheme,
        p,
        q,
        y_period,
        w_period,
        y_pattern,
        w_pattern,
        preamble_length,
        preamble_symbols,
        postamble_length,
        postamble_symbols,
        pilot_period: r.u8("pilot_period")?,
        pilot_block_length: r.u8("pilot_block_length")?,
    })
}

/// Symbols are packed four to a byte.
fn symbols(r: &mut TableReader<'_>, name: &'static str, count: u8) -> Result<Vec<u8>, TableError> {
    Ok(r.bytes(name, usize::from(count).div_ceil(4))?.to_vec())
}

/// `end` closes the tx format data; the permutation table fills up to it.
fn decode_custom_cpm(r: &mut TableReader<'_>, end: usize) -> Result<CustomCpmBurst, TableError> {
    let alphabet_size = r.u8("alphabet_size")?;
    let modulation_index = r.u8("modulation_index")?;
    let pulse_shape = r.u8("pulse_shape")?;
    let code_rate = r.u8("code_rate")?;
    let constraint_length = r.u8("constraint_length")?;
    let uw_length = r.u8("uw_length")?;
    let segment_count = r.u8("uw_segment_count")?;
    let uw_segments = r.counted(
        "uw_segment",
        u64::from(segment_count),
        layout::BCT_UW_SEGMENTS,
        |r, _| {
            Ok(UniqueWordSegment {
                start: r.u16("uw_segment_start")?,
                length: r.u8("uw_segment_length")?,
            })
        },
    )?;
    let [parameterized, _] = r.bits(
        1,
        [
            BitField::new("param_interleaver", 0x80),
            BitField::new("reserved", 0x7F),
        ],
    )?;

    let interleaver = if parameterized == 1 {
        Interleaver::Parameterized {
            n: r.u16("interleaver_n")?,
            s: r.u8("interleaver_s")?,
            p0: r.u16("interleaver_p0")?,
            p1: r.u16("interleaver_p1")?,
        }
    } else {
        let len = end.saturating_sub(r.offset());
        Interleaver::Permutation {
            pi_i: r.bytes("pi_i", len)?.to_vec(),
        }
    };

    Ok(CustomCpmBurst {
        alphabet_size,
        modulation_index,
        pulse_shape,
        code_rate,
        constraint_length,
        uw_length,
        uw_segments,
        interleaver,
    })
}
