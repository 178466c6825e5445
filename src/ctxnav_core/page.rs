mod controller;
mod layout;
mod message;
mod router;

pub use controller::*;
pub use layout::*;
pub use message::*;
pub use router::*;
