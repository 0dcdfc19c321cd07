//! Asynchronous issuance of project analysis tokens.
//!
//! An HTTP caller submits a project identifier; the request is published to a
//! durable AMQP topic and answered immediately. A separate worker consumes the
//! subscription and drives token generation against the external provider API.
//! The two paths are fully decoupled by the bus: the HTTP caller never observes
//! the outcome of generation.

pub mod api;
pub mod config;
pub mod errors;
pub mod models;
pub mod provider;
pub mod queue;
pub mod services;
