//! Interactive SQL console that pages large SELECT results by row identity
//! and streams them as JSON, fixed-width text or CSV.

pub mod cli;
pub mod console;
pub mod core;
pub mod error;
pub mod logging;
pub mod render;
