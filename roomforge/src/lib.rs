//! Shared types for the roomforge room-design pipeline.
//!
//! The backend reconstructs a 3D room model from a small set of photos and
//! detects furniture in it. This crate holds everything both sides of the
//! client (the desktop session and the phone-side submitter) agree on: the
//! wire types of the backend HTTP API, upload-session tokens, handoff
//! links, and the status classification that decides when a polled project
//! is done.

pub mod api;
pub mod error;
pub mod handoff;
pub mod session;
