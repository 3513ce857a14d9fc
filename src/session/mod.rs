//! Bridge session: actor, command protocol and public handle

mod actor;
mod commands;
pub mod correlation;
mod handle;
pub mod poll;

pub use handle::CecBridge;
