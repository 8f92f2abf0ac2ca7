//! Persistence for the credential store
//!
//! - `properties`: the textual key/value encoding of the record file
//! - `record_file`: whole-file load and atomic rewrite

pub mod properties;
mod record_file;

pub use record_file::{write_atomic, RecordFile};
