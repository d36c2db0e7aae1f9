//! Career intake — conversational interview service.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod interview;
pub mod recommend;
pub mod store;
