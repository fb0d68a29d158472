// ==========================================
// Space Stowage - Inventory API
// ==========================================
// Registration of containers / items and snapshot views.
// A batch is validated as a whole before anything is registered.
// ==========================================

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use crate::api::dto::RegisteredResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{validate_container, validate_item_descriptor};
use crate::domain::container::Container;
use crate::domain::item::{Item, ItemDescriptor};
use crate::repository::error::RepositoryError;
use crate::repository::inventory_store::{ArrangementEntry, ContainerSnapshot, InventoryStore};

pub struct InventoryApi {
    store: Arc<InventoryStore>,
}

impl InventoryApi {
    pub fn new(store: Arc<InventoryStore>) -> Self {
        Self { store }
    }

    pub fn add_containers(&self, containers: Vec<Container>) -> ApiResult<RegisteredResponse> {
        let mut seen = BTreeSet::new();
        for container in &containers {
            validate_container(container)?;
            if !seen.insert(container.container_id.as_str()) {
                return Err(ApiError::ValidationError(format!(
                    "container {} appears twice in the request",
                    container.container_id
                )));
            }
            match self.store.get_container(&container.container_id) {
                Ok(_) => {
                    return Err(ApiError::ValidationError(format!(
                        "container {} already exists",
                        container.container_id
                    )))
                }
                Err(RepositoryError::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let registered = containers.len();
        for container in containers {
            self.store.add_container(container)?;
        }
        info!(registered, "containers registered");
        Ok(RegisteredResponse { registered })
    }

    pub fn add_items(&self, items: Vec<ItemDescriptor>) -> ApiResult<RegisteredResponse> {
        let mut seen = BTreeSet::new();
        for descriptor in &items {
            validate_item_descriptor(descriptor)?;
            if !seen.insert(descriptor.item_id.as_str()) {
                return Err(ApiError::ValidationError(format!(
                    "item {} appears twice in the request",
                    descriptor.item_id
                )));
            }
            match self.store.get_item(&descriptor.item_id) {
                Ok(_) => {
                    return Err(ApiError::ValidationError(format!(
                        "item {} already exists",
                        descriptor.item_id
                    )))
                }
                Err(RepositoryError::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let registered = items.len();
        for descriptor in items {
            self.store.add_item(descriptor)?;
        }
        info!(registered, "items registered");
        Ok(RegisteredResponse { registered })
    }

    pub fn list_containers(&self) -> ApiResult<Vec<ContainerSnapshot>> {
        Ok(self.store.list_containers()?)
    }

    pub fn list_items(&self) -> ApiResult<Vec<Item>> {
        Ok(self.store.list_items()?)
    }

    pub fn get_item(&self, item_id: &str) -> ApiResult<Item> {
        Ok(self.store.get_item(item_id)?)
    }

    /// Stowed boxes of one container, open face first.
    pub fn arrangement(&self, container_id: &str) -> ApiResult<Vec<ArrangementEntry>> {
        Ok(self.store.arrangement(container_id)?)
    }
}
