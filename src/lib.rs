//! Inventory Management API
//!
//! A small HTTP API for inventory management:
//! - User registration and login with JWT access/refresh token issuance
//! - CRUD over inventory items backed by PostgreSQL
//! - Read-through (cache-aside) Redis cache for single-item lookups

pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod http;
pub mod store;
pub mod util;
