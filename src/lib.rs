//! A record-shredding [Apache Parquet](https://parquet.apache.org/) file
//! writer.
//!
//! This crate ingests a stream of logical records, shreds them into
//! repetition/definition-level columnar form per the [Dremel] model, encodes
//! and compresses column pages, tracks per-page statistics and column/offset
//! indexes, and emits a byte-for-byte compliant Parquet file.
//!
//! The entry point is [`writer::RecordWriter`]. A schema can be supplied as a
//! list of tag-annotated field descriptors, as a JSON schema document, or as a
//! programmatically built [`schema::types::SchemaType`] tree:
//!
//! ```no_run
//! use rowshred::writer::RecordWriter;
//! use rowshred::record::Record;
//!
//! let mut buf = Vec::new();
//! let mut writer = RecordWriter::from_fields(
//!     &mut buf,
//!     &[
//!         "name=id, type=INT64",
//!         "name=name, type=BYTE_ARRAY, convertedtype=UTF8, repetitiontype=OPTIONAL",
//!     ],
//! ).unwrap();
//!
//! writer.write_tuple(vec![1i64.into(), "alice".into()]).unwrap();
//! writer.stop().unwrap();
//! ```
//!
//! The writer is append-only: records accumulate into row groups which are
//! encoded column-parallel and flushed either when the buffered size passes
//! the configured row-group threshold or on an explicit flush. Reading
//! Parquet files back is out of scope.
//!
//! [Dremel]: https://research.google/pubs/pub36632/

#[macro_use]
pub mod errors;
pub mod basic;
pub mod thrift;

pub mod format;

pub(crate) mod util;

pub mod compression;
pub mod encodings;

pub mod column;
pub mod file;
pub mod record;
pub mod schema;
pub mod writer;
