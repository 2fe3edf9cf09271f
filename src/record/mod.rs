//! Dynamic record values and the marshaller that shreds them into
//! per-column level/value triples.

pub mod shred;
pub mod value;

pub use shred::{shred_record, TripleBuffer};
pub use value::{Int96, Record, Value};
