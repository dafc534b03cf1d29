//! Tables stored in WOFF2 specific formats

pub mod glyf;
