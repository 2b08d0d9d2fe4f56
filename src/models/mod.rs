// Data models

pub mod readiness;
pub mod webhook;
pub mod workout;

pub use readiness::*;
pub use webhook::*;
pub use workout::*;
