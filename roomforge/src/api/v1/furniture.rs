//! Furniture catalog records, as returned by `GET /furniture`.

use serde::{Deserialize, Serialize};

/// Outer dimensions of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

/// An immutable furniture catalog record.
///
/// Owned by the backend; the client passes these across the design
/// boundary as value types and never mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnitureItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub style: String,
    pub dimensions: Dimensions,
    pub model_path: String,
}
