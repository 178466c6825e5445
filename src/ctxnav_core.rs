mod config;
mod error;
mod lifecycle;
pub mod memory;
mod model;
mod page;
mod route;
mod semantic;
mod state;
mod types;

pub use config::*;
pub use error::*;
pub use lifecycle::*;
pub use model::*;
pub use page::*;
pub use route::*;
pub use semantic::*;
pub use state::*;
pub use types::*;
