//! Command implementations

pub mod dump;
pub mod health;
pub mod pod;
pub mod redact;

pub use dump::*;
pub use health::*;
pub use pod::*;
pub use redact::*;
