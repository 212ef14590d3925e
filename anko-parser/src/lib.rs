//! Anko Terminal Parser
//!
//! VT/xterm escape sequence parser for the anko terminal core. The
//! parser consumes the raw byte stream from a pseudo-terminal and
//! mutates a `Screen` in place, archiving rows that scroll off the
//! visible region into a shared `ScrollbackStore`.
//!
//! Design notes:
//! - Streaming: chunk boundaries are arbitrary, state carries across calls
//! - Fail-soft: malformed sequences are dropped, never errors or panics
//! - Bounded: intermediate and OSC accumulators have hard length caps

pub mod params;
pub mod parser;
pub mod replay;

pub use params::Params;
pub use parser::{Feed, Parser};
pub use replay::replay;
