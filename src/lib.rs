pub mod api;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod ffi;
pub mod vault;
