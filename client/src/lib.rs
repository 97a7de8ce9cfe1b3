//! Client-side session logic for the roomforge pipeline.
//!
//! Three independent actors cooperate to turn room photos into a 3D
//! model: the desktop session, an optional phone session reached via a
//! QR handoff, and the backend processing pipeline. They communicate
//! only through polling over HTTP; this crate owns the state machines
//! that keep them in step.

pub mod api;
pub mod config;
pub mod controller;
pub mod handoff;
pub mod poll;
pub mod remote;
pub mod version;
