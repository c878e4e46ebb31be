//! High-level convenience API.
//!
//! This layer provides [`AddrGen`], an ergonomic wrapper that owns a
//! [`Config`](crate::Config) and drives the [`model`](crate::model) layer end
//! to end, plus plain-text address file helpers.
//!
//! For production or library code, prefer importing from [`kernel`](crate::kernel)
//! and [`model`](crate::model) directly.

pub mod client;
pub mod files;

pub use client::AddrGen;
pub use files::{read_addresses, write_hex_file};
