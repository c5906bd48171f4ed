//! # blueflow-server
//!
//! HTTP server library for blueflow.
//!
//! This library provides the API handlers and state management that expose a
//! running discovery session over REST.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;
