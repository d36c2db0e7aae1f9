//! The interview core: session data model, answer validation and
//! normalization, the wire protocol, and the state machine that drives
//! one connection through the question catalog.

pub mod handler;
pub mod model;
pub mod normalize;
pub mod protocol;
pub mod validate;
pub mod ws;
