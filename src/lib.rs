//! Folio: portfolio and blog backend with a read-through collection cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
