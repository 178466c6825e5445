mod manager;
mod params;
mod side_effects;

pub use manager::*;
pub use params::*;
pub use side_effects::*;
