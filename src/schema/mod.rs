//! Schema model: the column tree, its flattened leaf descriptors, and the
//! adapters that build trees from tag descriptors or JSON documents.

pub mod json;
pub mod tag;
pub mod types;
