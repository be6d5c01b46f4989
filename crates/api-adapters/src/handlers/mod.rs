//! # Handlers
//!
//! Each handler converts the request into a service call and the outcome
//! into a status code and JSON body.

pub mod auth;
pub mod health;
pub mod threads;
