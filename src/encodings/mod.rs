pub mod encoding;
pub mod levels;
pub mod rle;
