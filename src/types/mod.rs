//! Value types shared across the crate.

mod arguments;
mod context;
mod timeout;

pub use arguments::{Arguments, Param, ViewletArgs};
pub use context::Context;
pub use timeout::Timeout;
