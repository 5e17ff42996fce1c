//! Hand-off point for payloads that belong to another protocol.
//!
//! The network layer info descriptor carries an SNMP PDU. The table decoder
//! only computes where that PDU sits; the host decides how to render it.

use serde::Serialize;

use super::field::Field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddedProtocol {
    Snmp,
}

pub trait EmbeddedDecoder {
    /// Decode `payload`, found at `offset` in the table buffer. Returned
    /// fields are attached under the enclosing descriptor node.
    fn decode_embedded(
        &self,
        protocol: EmbeddedProtocol,
        offset: usize,
        payload: &[u8],
    ) -> Vec<Field>;
}

/// Leaves embedded payloads as opaque bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEmbeddedDecoder;

impl EmbeddedDecoder for NoEmbeddedDecoder {
    fn decode_embedded(
        &self,
        _protocol: EmbeddedProtocol,
        _offset: usize,
        _payload: &[u8],
    ) -> Vec<Field> {
        Vec::new()
    }
}
