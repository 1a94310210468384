//! Stockroom
//!
//! Product catalog, low-stock reporting and an atomic sales ledger on top of
//! a relational store.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod migrator;
pub mod services;

pub use errors::ServiceError;
pub use services::InventoryServices;
