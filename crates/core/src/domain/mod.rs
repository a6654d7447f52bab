pub mod details;
pub mod format;
pub mod quote;
pub mod session;
