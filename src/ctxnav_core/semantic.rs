mod predicate;
mod resolver;

pub use predicate::*;
pub use resolver::*;
