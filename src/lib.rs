//! merenda - a school snack-ordering API server
//!
//! Students browse the catalog and place orders; class representatives and
//! administrators manage orders, products, users, and the classroom registry.

pub mod auth;
pub mod classes;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod orders;
pub mod policy;
pub mod routes;
pub mod state;
pub mod store;

pub use cli::Args;
