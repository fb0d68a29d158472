// ==========================================
// Space Stowage - Request validator
// ==========================================
// Boundary checks on caller input. Violations are collected and
// reported together as one ValidationError.
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::container::Container;
use crate::domain::geometry::{BoundingBox, Dimensions};
use crate::domain::item::{ItemDescriptor, MAX_PRIORITY, MIN_PRIORITY};

/// Accumulates violations for one request.
#[derive(Debug, Default)]
pub struct Violations {
    messages: Vec<String>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn require_id(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(format!("{} is required", field));
        }
    }

    pub fn check_dimensions(&mut self, subject: &str, dims: &Dimensions) {
        if !dims.is_valid() {
            self.push(format!(
                "{} dimensions must be positive, got {}",
                subject, dims
            ));
        }
    }

    pub fn into_result(self) -> ApiResult<()> {
        if self.messages.is_empty() {
            Ok(())
        } else {
            Err(ApiError::ValidationError(self.messages.join("; ")))
        }
    }
}

pub fn validate_item_descriptor(descriptor: &ItemDescriptor) -> ApiResult<()> {
    let mut v = Violations::new();
    v.require_id("itemId", &descriptor.item_id);
    v.require_id("name", &descriptor.name);
    v.check_dimensions(&format!("item {}", descriptor.item_id), &descriptor.dimensions);
    if !descriptor.mass.is_finite() || descriptor.mass < 0.0 {
        v.push(format!("mass must be a non-negative number, got {}", descriptor.mass));
    }
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&descriptor.priority) {
        v.push(format!(
            "priority must be within [{}, {}], got {}",
            MIN_PRIORITY, MAX_PRIORITY, descriptor.priority
        ));
    }
    if let Some(zone) = &descriptor.preferred_zone {
        if zone.trim().is_empty() {
            v.push("preferredZone must not be blank");
        }
    }
    v.into_result()
}

pub fn validate_container(container: &Container) -> ApiResult<()> {
    let mut v = Violations::new();
    v.require_id("containerId", &container.container_id);
    v.require_id("zone", &container.zone);
    v.check_dimensions(
        &format!("container {}", container.container_id),
        &container.dimensions,
    );
    v.into_result()
}

/// Well-formed box whose extent equals the item's dimensions (no rotation).
pub fn validate_position(position: &BoundingBox, item_dims: &Dimensions, eps: f64) -> ApiResult<()> {
    if !position.is_well_formed() {
        return Err(ApiError::ValidationError(format!(
            "position {} is not a well-formed box",
            position
        )));
    }
    let extent = position.dimensions();
    let close = |a: f64, b: f64| (a - b).abs() <= eps;
    if !(close(extent.width, item_dims.width)
        && close(extent.depth, item_dims.depth)
        && close(extent.height, item_dims.height))
    {
        return Err(ApiError::ValidationError(format!(
            "position extent {} does not match item dimensions {}",
            extent, item_dims
        )));
    }
    Ok(())
}
