//! DVB-RCS / RCS2 signalling table decoding.
//!
//! A table starts with a header whose shape depends on the revision (compact
//! under RCS2; generic private section, DSM-CC or bare length under RCS). The
//! header's table id selects a body decoder, which walks counted loops,
//! conditional fields and tag-length descriptors. Every value is also
//! recorded as a [`Field`] with its byte range, so a failure still hands back
//! the decoded prefix.
//!
//! Loop conventions (`raw + 1` or `raw` iterations) are named per site in
//! `layout`. Descriptor payloads never read past their declared length; any
//! unread remainder is kept as private data. RCS sections end in a
//! CRC-32/MPEG-2 trailer that is checked but never fatal.
//!
//! Version française (résumé):
//! Le module décode les tables de signalisation DVB-RCS/RCS2 : en-tête selon
//! la révision, corps selon l'identifiant de table, descripteurs bornés par
//! leur longueur (le reste devient `private_data`). Chaque valeur est aussi un
//! `Field` avec sa plage d'octets, y compris en cas d'erreur.

pub mod config;
pub mod descriptors;
pub mod embedded;
pub mod error;
pub mod field;
pub mod header;
pub mod layout;
pub mod parser;
pub mod reader;
pub mod tables;

pub use config::{ConfigError, DecodeConfig, Revision, SharedRevision};
pub use embedded::{EmbeddedDecoder, EmbeddedProtocol, NoEmbeddedDecoder};
pub use error::TableError;
pub use field::{Field, FieldValue, find_field};
pub use header::TableHeader;
pub use layout::TableKind;
pub use parser::{DecodeFailure, DecodeResult, SectionCrc, decode_table, decode_table_with};
pub use tables::TableBody;
