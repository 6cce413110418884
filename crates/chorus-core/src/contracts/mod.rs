//! Wire contracts shared with the conversation server.
//!
//! Keep these free of runtime types: they describe JSON shapes and route
//! strings only.

pub mod http;
pub mod ws;
