//! Wire types of the backend HTTP API.

pub mod v1;
