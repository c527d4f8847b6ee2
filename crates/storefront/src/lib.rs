//! Farmerspot Storefront library.
//!
//! Client-side state for the Farmerspot marketplace, where farmers list
//! produce and customers buy it. All persistence and business rules live
//! behind a remote HTTP API; this crate keeps the session's local view of
//! that API consistent.
//!
//! # Modules
//!
//! - [`api`] - Remote API client speaking the `{ statusCode, message, data }` envelope
//! - [`cart`] - Cart synchronization core: snapshot, count, observers, optimistic updates
//! - [`session`] - Signed-in identity and role gating
//! - [`query_cache`] - Request-keyed cache with prefix invalidation
//! - [`state`] - [`Storefront`] context tying the above together
//! - [`orders`], [`nav`], [`notice`] - Dashboards, checkout grouping, menus and user notices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod error;
pub mod nav;
pub mod notice;
pub mod orders;
pub mod query_cache;
pub mod session;
pub mod state;

pub use error::{Result, StorefrontError};
pub use state::{CheckoutDetails, Storefront};
