pub mod ctxnav_core;

pub use ctxnav_core::*;
