//! Building blocks for compressing one bundle: ordered concatenation, minification and output.

pub mod compress;
pub mod concat;
pub mod minify;
