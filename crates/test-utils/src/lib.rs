//! This crate provides test-utilities shared by the workspace's tests and the dev simulator.
//!
//! The centerpiece is the [`endpoint::InMemoryEndpoint`], a local stand-in for the external
//! message-transport endpoint that routes payloads between in-process chain actors and can
//! replay deliveries to exercise the at-least-once assumption.

pub mod clock;
pub mod endpoint;
pub mod generators;
