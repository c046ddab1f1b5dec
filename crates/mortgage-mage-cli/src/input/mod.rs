pub mod config;
pub mod deal;
pub mod document;
