//! Shared data models for remote function calls

mod call;
mod field;
mod message;
mod signature;

pub use call::*;
pub use field::*;
pub use message::*;
pub use signature::*;
