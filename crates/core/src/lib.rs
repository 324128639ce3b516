//! Domain logic for the Titanic survival prediction service.
//!
//! Holds the request schema and its validation, the tree-ensemble predictor
//! and artifact loader, and the startup run tracker. Nothing here depends on
//! the HTTP transport, so every piece is testable without a server.

pub mod error;
pub mod model;
pub mod passenger;
pub mod tracking;
