mod matched;
mod path;
mod target;

pub use matched::*;
pub use path::*;
pub use target::*;
