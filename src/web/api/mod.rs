pub mod error;
pub mod sessions;
