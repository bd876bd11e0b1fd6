//! Transports
//!
//! Concrete stream transports feeding the framing-agnostic connection
//! loop. The core depends only on the byte interface plus connection
//! lifecycle; TCP and stdio are provided here.

pub mod stdio;
pub mod tcp;
