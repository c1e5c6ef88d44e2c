//! Outcome shaping and shared user-facing messages.

mod messages;
pub(crate) mod outcome;

pub(crate) use messages::*;
