mod context;
mod filter;
mod meta;
mod odata;

pub use context::*;
pub use filter::*;
pub use meta::*;
pub use odata::*;
