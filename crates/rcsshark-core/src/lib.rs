//! rcsshark core library for DVB-RCS / RCS2 signalling table decoding.
//!
//! This crate decodes the control-plane tables a satellite hub broadcasts to
//! return-channel terminals (NIT, SCT, FCT, TBTP, TIM, BCT and friends) into
//! typed structures plus a field tree carrying every value's byte range.
//! Decoding is byte-oriented and side-effect free; all I/O lives in the CLI.
//! Protocol conventions are captured in readers so table decoders stay
//! minimal and consistent with the wire layouts.
//!
//! Invariants:
//! - Decoding never reads outside the input buffer.
//! - Identical inputs and configuration give identical results.
//! - A failure carries the error, its offset and every field decoded before it.
//!
//! Version française (résumé):
//! Cette crate décode les tables de signalisation DVB-RCS/RCS2 en structures
//! typées et en arbre de champs (avec plages d'octets). Le décodage est pur,
//! sans E/S ; la CLI gère les fichiers. Garanties : aucun accès hors tampon,
//! résultats déterministes, préfixe décodé conservé en cas d'erreur.
//!
//! # Examples
//! ```
//! use rcsshark_core::{DecodeConfig, Revision, decode_report};
//!
//! let bytes = [0x70, 0x00, 0x01, 0xc1, 0x00, 0xc0, 0x79, 0x12, 0x45, 0x00];
//! let report = decode_report("tdt.bin", &bytes, &DecodeConfig::new(Revision::Rcs2));
//! assert!(report.error.is_none());
//! assert_eq!(report.bytes_consumed, 10);
//! ```

use serde::Serialize;

mod protocols;

pub use protocols::dvb_s2_table::{
    ConfigError, DecodeConfig, DecodeFailure, DecodeResult, EmbeddedDecoder, EmbeddedProtocol,
    Field, FieldValue, NoEmbeddedDecoder, Revision, SectionCrc, SharedRevision, TableBody,
    TableError, TableHeader, TableKind, decode_table, decode_table_with, find_field,
};
pub use protocols::dvb_s2_table::{descriptors, layout, reader, tables};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;

/// Decode report for one input table.
///
/// # Examples
/// ```
/// use rcsshark_core::{DecodeConfig, decode_report};
///
/// let report = decode_report("empty.bin", &[], &DecodeConfig::default());
/// assert_eq!(report.report_version, rcsshark_core::REPORT_VERSION);
/// assert!(report.error.is_some());
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    /// Tool identification metadata.
    pub tool: ToolInfo,
    /// Input metadata.
    pub input: InputInfo,
    /// Revision the input was decoded under.
    pub revision: Revision,
    /// Bytes consumed by the decoder (up to the failure offset on error).
    pub bytes_consumed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<TableHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<TableBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crc: Option<SectionCrc>,
    /// Field tree in wire order.
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReportError>,
}

/// Tool metadata embedded in reports.
///
/// # Examples
/// ```
/// use rcsshark_core::ToolInfo;
///
/// let tool = ToolInfo {
///     name: "rcsshark".to_string(),
///     version: "0.1.0".to_string(),
/// };
/// assert_eq!(tool.name, "rcsshark");
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    /// Tool name (e.g., "rcsshark").
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

/// Input metadata embedded in reports.
///
/// # Examples
/// ```
/// use rcsshark_core::InputInfo;
///
/// let input = InputInfo {
///     path: "sct.bin".to_string(),
///     bytes: 40,
/// };
/// assert_eq!(input.bytes, 40);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct InputInfo {
    /// Input path as provided to the decoder.
    pub path: String,
    /// Input size in bytes.
    pub bytes: u64,
}

/// Decode error as recorded in a report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportError {
    /// Stable error kind (e.g., `out_of_bounds`).
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// Byte offset where decoding stopped.
    pub offset: usize,
}

/// Decode `bytes` and wrap the outcome in a [`Report`].
///
/// Failures are not returned as errors: the report keeps the decoded field
/// prefix and records the error.
pub fn decode_report(input_path: &str, bytes: &[u8], config: &DecodeConfig) -> Report {
    let mut report = Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "rcsshark".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        input: InputInfo {
            path: input_path.to_string(),
            bytes: bytes.len() as u64,
        },
        revision: config.revision,
        bytes_consumed: 0,
        header: None,
        body: None,
        crc: None,
        fields: Vec::new(),
        error: None,
    };
    match decode_table(bytes, config) {
        Ok(result) => {
            report.bytes_consumed = result.bytes_consumed;
            report.header = Some(result.header);
            report.body = result.body;
            report.crc = result.crc;
            report.fields = result.fields;
        }
        Err(failure) => {
            report.bytes_consumed = failure.offset;
            report.error = Some(ReportError {
                kind: failure.error.kind().to_string(),
                message: failure.error.to_string(),
                offset: failure.offset,
            });
            report.fields = failure.fields;
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::{DecodeConfig, Revision, decode_report};

    #[test]
    fn report_serializes_header_and_body() {
        let bytes = [0x70, 0x00, 0x01, 0xc1, 0x00, 0xc0, 0x79, 0x12, 0x45, 0x00];
        let report = decode_report("tdt.bin", &bytes, &DecodeConfig::new(Revision::Rcs2));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["revision"], "rcs2");
        assert_eq!(json["header"]["table_id"], 0x70);
        assert_eq!(json["body"]["tdt"]["utc"], "1993-10-13T12:45:00Z");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn report_keeps_prefix_on_failure() {
        let bytes = [0x70, 0x00, 0x01, 0xc1, 0x00, 0xc0, 0x79, 0x12];
        let report = decode_report("tdt.bin", &bytes, &DecodeConfig::new(Revision::Rcs2));
        let error = report.error.unwrap();
        assert_eq!(error.kind, "out_of_bounds");
        assert_eq!(error.offset, 8);
        assert_eq!(report.bytes_consumed, 8);
        assert!(report.header.is_none());
        assert_eq!(report.fields.len(), 2);
    }
}
