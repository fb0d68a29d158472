// ==========================================
// Space Stowage - Container entity
// ==========================================
// Created at system init, never deleted in this core.
// What it holds changes only through placement / retrieval.
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::geometry::{BoundingBox, Coordinates, Dimensions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub container_id: String,
    pub zone: String,
    #[serde(flatten)]
    pub dimensions: Dimensions,
    /// Origin of the container in ship coordinates.
    #[serde(default = "origin")]
    pub position: Coordinates,
}

fn origin() -> Coordinates {
    Coordinates::ORIGIN
}

impl Container {
    pub fn new(container_id: &str, zone: &str, width: f64, depth: f64, height: f64) -> Self {
        Self {
            container_id: container_id.to_string(),
            zone: zone.to_string(),
            dimensions: Dimensions::new(width, depth, height),
            position: Coordinates::ORIGIN,
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::container_bounds(&self.dimensions)
    }

    pub fn volume(&self) -> f64 {
        self.dimensions.volume()
    }

    pub fn in_zone(&self, zone: Option<&str>) -> bool {
        zone.map(|z| z == self.zone).unwrap_or(false)
    }
}
