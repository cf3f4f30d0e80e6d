//! Core types, validation and aggregation for the ActivFlow reporting
//! backend.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement [`store::ActivityStore`]; the operations in [`service`]
//! are written against that trait only.

// Native `async fn` in traits; `Send` bounds are spelled out on the trait.
#![allow(async_fn_in_trait)]

pub mod activity;
pub mod dashboard;
pub mod error;
pub mod form;
pub mod kpi;
pub mod rbac;
pub mod service;
pub mod slug;
pub mod store;
pub mod user;
pub mod validate;

pub use error::{Error, Result};
