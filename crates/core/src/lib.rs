//! Farmerspot Core - Shared types library.
//!
//! This crate provides the domain types used across the Farmerspot client:
//! - `storefront` - Remote API client, cart synchronization, session state
//! - `cli` - Command-line tool for driving a storefront session
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no caches.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, roles, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
