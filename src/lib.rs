pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod extractors;
pub mod fulfillment;
pub mod handlers;
pub mod keys;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod state;
pub mod store;
pub mod util;
