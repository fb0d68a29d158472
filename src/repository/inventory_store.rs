// ==========================================
// Space Stowage - Inventory store
// ==========================================
// Authoritative in-memory stores: containers (+ spatial index each),
// items, mission date.
// ==========================================
// Lock order (always, to stay deadlock free):
//   epoch -> container indexes (ascending id) -> items -> date
// epoch: read for every request, write for the day advance.
// Container index: RwLock per container, the per-container exclusion.
// ==========================================
// Commit pattern: stage changes on clones, append the audit entries,
// then swap the staged state in (infallible).
// ==========================================

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::container::Container;
use crate::domain::geometry::BoundingBox;
use crate::domain::item::{Item, ItemDescriptor, ItemPlacement};
use crate::domain::types::ItemState;
use crate::engine::placement::ContainerView;
use crate::engine::spatial_index::SpatialIndex;
use crate::repository::error::{RepositoryError, RepositoryResult};

fn lock_err<T>(e: PoisonError<T>) -> RepositoryError {
    RepositoryError::LockError(e.to_string())
}

struct ContainerSlot {
    container: Container,
    index: RwLock<SpatialIndex>,
}

/// Container plus occupancy figures for snapshot views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSnapshot {
    #[serde(flatten)]
    pub container: Container,
    pub utilization: f64,
    pub item_count: usize,
}

/// Reserved boxes of one container, by item id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrangementEntry {
    pub item_id: String,
    pub name: String,
    pub position: BoundingBox,
}

// ==========================================
// InventoryStore
// ==========================================
pub struct InventoryStore {
    epoch: RwLock<()>,
    containers: RwLock<BTreeMap<String, Arc<ContainerSlot>>>,
    items: RwLock<BTreeMap<String, Item>>,
    current_date: RwLock<NaiveDate>,
    eps: f64,
}

impl InventoryStore {
    pub fn new(start_date: NaiveDate, eps: f64) -> Self {
        Self {
            epoch: RwLock::new(()),
            containers: RwLock::new(BTreeMap::new()),
            items: RwLock::new(BTreeMap::new()),
            current_date: RwLock::new(start_date),
            eps,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.eps
    }

    pub fn current_date(&self) -> RepositoryResult<NaiveDate> {
        let _epoch = self.epoch.read().map_err(lock_err)?;
        let date = *self.current_date.read().map_err(lock_err)?;
        Ok(date)
    }

    // ==========================================
    // Registration
    // ==========================================

    pub fn add_container(&self, container: Container) -> RepositoryResult<()> {
        let _epoch = self.epoch.read().map_err(lock_err)?;
        let mut map = self.containers.write().map_err(lock_err)?;
        if map.contains_key(&container.container_id) {
            return Err(RepositoryError::UniqueConstraintViolation(format!(
                "container {} already exists",
                container.container_id
            )));
        }
        let index = SpatialIndex::new(&container, self.eps);
        debug!(container_id = %container.container_id, zone = %container.zone, "container registered");
        map.insert(
            container.container_id.clone(),
            Arc::new(ContainerSlot {
                container,
                index: RwLock::new(index),
            }),
        );
        Ok(())
    }

    pub fn add_item(&self, descriptor: ItemDescriptor) -> RepositoryResult<Item> {
        let _epoch = self.epoch.read().map_err(lock_err)?;
        let mut items = self.items.write().map_err(lock_err)?;
        if items.contains_key(&descriptor.item_id) {
            return Err(RepositoryError::UniqueConstraintViolation(format!(
                "item {} already exists",
                descriptor.item_id
            )));
        }
        let item = Item::from_descriptor(descriptor);
        items.insert(item.item_id.clone(), item.clone());
        Ok(item)
    }

    /// Register an item for planning: unknown or still Unplaced items take
    /// the descriptor; otherwise the stored item is returned unchanged.
    pub fn register_for_placement(&self, descriptor: ItemDescriptor) -> RepositoryResult<Item> {
        let _epoch = self.epoch.read().map_err(lock_err)?;
        let mut items = self.items.write().map_err(lock_err)?;
        match items.get(&descriptor.item_id) {
            Some(existing) if existing.state != ItemState::Unplaced => Ok(existing.clone()),
            _ => {
                let item = Item::from_descriptor(descriptor);
                items.insert(item.item_id.clone(), item.clone());
                Ok(item)
            }
        }
    }

    // ==========================================
    // Lookups (short read sections)
    // ==========================================

    pub fn get_item(&self, item_id: &str) -> RepositoryResult<Item> {
        let items = self.items.read().map_err(lock_err)?;
        items
            .get(item_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("Item", item_id))
    }

    /// Case-insensitive exact name match, first by id order.
    pub fn find_item_by_name(&self, name: &str) -> RepositoryResult<Option<Item>> {
        let needle = name.trim().to_lowercase();
        let items = self.items.read().map_err(lock_err)?;
        Ok(items
            .values()
            .find(|i| i.name.to_lowercase() == needle)
            .cloned())
    }

    pub fn list_items(&self) -> RepositoryResult<Vec<Item>> {
        let items = self.items.read().map_err(lock_err)?;
        Ok(items.values().cloned().collect())
    }

    pub fn get_container(&self, container_id: &str) -> RepositoryResult<Container> {
        let map = self.containers.read().map_err(lock_err)?;
        map.get(container_id)
            .map(|slot| slot.container.clone())
            .ok_or_else(|| RepositoryError::not_found("Container", container_id))
    }

    pub fn container_ids(&self) -> RepositoryResult<Vec<String>> {
        let map = self.containers.read().map_err(lock_err)?;
        Ok(map.keys().cloned().collect())
    }

    pub fn list_containers(&self) -> RepositoryResult<Vec<ContainerSnapshot>> {
        self.read_session(|session| {
            session
                .views()
                .into_iter()
                .map(|view| ContainerSnapshot {
                    container: view.container.clone(),
                    utilization: view.index.utilization(),
                    item_count: view.index.len(),
                })
                .collect()
        })
    }

    pub fn arrangement(&self, container_id: &str) -> RepositoryResult<Vec<ArrangementEntry>> {
        self.read_session(|session| -> RepositoryResult<Vec<ArrangementEntry>> {
            let view = session
                .view(container_id)
                .ok_or_else(|| RepositoryError::not_found("Container", container_id))?;
            let mut entries: Vec<ArrangementEntry> = view
                .index
                .reservations()
                .map(|(item_id, position)| ArrangementEntry {
                    item_id: item_id.clone(),
                    name: session
                        .items()
                        .get(item_id)
                        .map(|i| i.name.clone())
                        .unwrap_or_default(),
                    position: *position,
                })
                .collect();
            entries.sort_by(|a, b| {
                crate::engine::spatial_index::compare_open_face_first(
                    &a.position.start_coordinates,
                    &b.position.start_coordinates,
                )
                .then_with(|| a.item_id.cmp(&b.item_id))
            });
            Ok(entries)
        })?
    }

    fn slots_sorted(&self, ids: Option<&[&str]>) -> RepositoryResult<Vec<Arc<ContainerSlot>>> {
        let map = self.containers.read().map_err(lock_err)?;
        match ids {
            None => Ok(map.values().cloned().collect()),
            Some(ids) => {
                let mut wanted: Vec<&str> = ids.to_vec();
                wanted.sort_unstable();
                wanted.dedup();
                wanted
                    .into_iter()
                    .map(|id| {
                        map.get(id)
                            .cloned()
                            .ok_or_else(|| RepositoryError::not_found("Container", id))
                    })
                    .collect()
            }
        }
    }

    // ==========================================
    // Sessions
    // ==========================================

    /// Consistent read-only view of every container and item.
    pub fn read_session<R>(&self, f: impl FnOnce(&ReadSession<'_>) -> R) -> RepositoryResult<R> {
        let _epoch = self.epoch.read().map_err(lock_err)?;
        let slots = self.slots_sorted(None)?;
        let mut containers = Vec::with_capacity(slots.len());
        for slot in &slots {
            let guard = slot.index.read().map_err(lock_err)?;
            containers.push((&slot.container, guard));
        }
        let items = self.items.read().map_err(lock_err)?;
        let current_date = *self.current_date.read().map_err(lock_err)?;

        let session = ReadSession {
            containers,
            items,
            current_date,
        };
        Ok(f(&session))
    }

    /// Exclusive section over the listed containers (ascending id order)
    /// plus the item map.
    pub fn write_session<R>(
        &self,
        container_ids: &[&str],
        f: impl FnOnce(&mut WriteSession<'_>) -> RepositoryResult<R>,
    ) -> RepositoryResult<R> {
        let _epoch = self.epoch.read().map_err(lock_err)?;
        let slots = self.slots_sorted(Some(container_ids))?;
        let mut containers = BTreeMap::new();
        for slot in &slots {
            let guard = slot.index.write().map_err(lock_err)?;
            containers.insert(slot.container.container_id.clone(), (&slot.container, guard));
        }
        let items = self.items.write().map_err(lock_err)?;
        let current_date = *self.current_date.read().map_err(lock_err)?;

        let mut session = WriteSession {
            containers,
            items,
            current_date,
        };
        f(&mut session)
    }

    /// Global write section for the day advance.
    pub fn advance_session<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, Item>, &mut NaiveDate) -> RepositoryResult<R>,
    ) -> RepositoryResult<R> {
        let _epoch = self.epoch.write().map_err(lock_err)?;
        let mut items = self.items.write().map_err(lock_err)?;
        let mut date = self.current_date.write().map_err(lock_err)?;

        // Work on copies so a failed log append leaves nothing behind.
        let mut staged_items = items.clone();
        let mut staged_date = *date;
        let result = f(&mut staged_items, &mut staged_date)?;
        *items = staged_items;
        *date = staged_date;
        info!(current_date = %*date, "mission date advanced");
        Ok(result)
    }
}

// ==========================================
// ReadSession
// ==========================================
pub struct ReadSession<'a> {
    containers: Vec<(&'a Container, RwLockReadGuard<'a, SpatialIndex>)>,
    items: RwLockReadGuard<'a, BTreeMap<String, Item>>,
    current_date: NaiveDate,
}

impl<'a> ReadSession<'a> {
    /// Every container, ascending id.
    pub fn views(&self) -> Vec<ContainerView<'_>> {
        self.containers
            .iter()
            .map(|(container, index)| ContainerView::new(container, index))
            .collect()
    }

    pub fn view(&self, container_id: &str) -> Option<ContainerView<'_>> {
        self.containers
            .iter()
            .find(|(c, _)| c.container_id == container_id)
            .map(|(container, index)| ContainerView::new(container, index))
    }

    pub fn items(&self) -> &BTreeMap<String, Item> {
        &self.items
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }
}

// ==========================================
// WriteSession + StagedChanges
// ==========================================
pub struct WriteSession<'a> {
    containers: BTreeMap<String, (&'a Container, RwLockWriteGuard<'a, SpatialIndex>)>,
    items: RwLockWriteGuard<'a, BTreeMap<String, Item>>,
    current_date: NaiveDate,
}

impl<'a> WriteSession<'a> {
    pub fn view(&self, container_id: &str) -> Option<ContainerView<'_>> {
        self.containers
            .get(container_id)
            .map(|(container, index)| ContainerView::new(container, index))
    }

    pub fn views(&self) -> Vec<ContainerView<'_>> {
        self.containers
            .values()
            .map(|(container, index)| ContainerView::new(container, index))
            .collect()
    }

    pub fn is_locked(&self, container_id: &str) -> bool {
        self.containers.contains_key(container_id)
    }

    pub fn items(&self) -> &BTreeMap<String, Item> {
        &self.items
    }

    pub fn item(&self, item_id: &str) -> RepositoryResult<&Item> {
        self.items
            .get(item_id)
            .ok_or_else(|| RepositoryError::not_found("Item", item_id))
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn stage(&self) -> StagedChanges {
        StagedChanges::default()
    }

    /// Swap staged indexes and items in. Cannot fail.
    pub fn apply(&mut self, staged: StagedChanges) {
        for (container_id, index) in staged.indexes {
            if let Some((_, guard)) = self.containers.get_mut(&container_id) {
                **guard = index;
            }
        }
        for (item_id, item) in staged.items {
            match item {
                Some(item) => {
                    self.items.insert(item_id, item);
                }
                None => {
                    self.items.remove(&item_id);
                }
            }
        }
    }
}

/// Pending index/item changes of one write session.
#[derive(Debug, Default)]
pub struct StagedChanges {
    indexes: BTreeMap<String, SpatialIndex>,
    /// None: item removed from the store.
    items: BTreeMap<String, Option<Item>>,
}

impl StagedChanges {
    fn index_mut<'s>(
        &'s mut self,
        session: &WriteSession<'_>,
        container_id: &str,
    ) -> RepositoryResult<&'s mut SpatialIndex> {
        if !self.indexes.contains_key(container_id) {
            let (_, guard) = session.containers.get(container_id).ok_or_else(|| {
                RepositoryError::InternalError(format!(
                    "container {} is not locked by this session",
                    container_id
                ))
            })?;
            self.indexes
                .insert(container_id.to_string(), (**guard).clone());
        }
        self.indexes
            .get_mut(container_id)
            .ok_or_else(|| RepositoryError::InternalError("staged index vanished".to_string()))
    }

    /// Item as it will look after commit.
    pub fn item(&self, session: &WriteSession<'_>, item_id: &str) -> RepositoryResult<Item> {
        match self.items.get(item_id) {
            Some(Some(item)) => Ok(item.clone()),
            Some(None) => Err(RepositoryError::not_found("Item", item_id)),
            None => session.item(item_id).cloned(),
        }
    }

    /// Reserve `position` in `container_id` and mark the item Stowed
    /// (Waste items keep their state).
    pub fn stow(
        &mut self,
        session: &WriteSession<'_>,
        item_id: &str,
        container_id: &str,
        position: BoundingBox,
    ) -> RepositoryResult<()> {
        let mut item = self.item(session, item_id)?;
        self.index_mut(session, container_id)?
            .reserve(item_id, position)?;
        if item.state != ItemState::Waste {
            item.state = ItemState::Stowed;
        }
        item.placement = Some(ItemPlacement {
            container_id: container_id.to_string(),
            position,
        });
        self.items.insert(item_id.to_string(), Some(item));
        Ok(())
    }

    /// Release the item's reservation; it keeps existing without placement.
    /// Returns the item as it was before.
    pub fn unstow(
        &mut self,
        session: &WriteSession<'_>,
        item_id: &str,
        new_state: ItemState,
    ) -> RepositoryResult<Item> {
        let before = self.item(session, item_id)?;
        let placement = before.placement.clone().ok_or_else(|| {
            RepositoryError::conflict(format!("item {} has no placement", item_id))
        })?;
        self.index_mut(session, &placement.container_id)?
            .release(item_id)?;
        let mut after = before.clone();
        after.placement = None;
        after.state = new_state;
        self.items.insert(item_id.to_string(), Some(after));
        Ok(before)
    }

    /// Release any reservation and drop the item from the store.
    pub fn dispose(&mut self, session: &WriteSession<'_>, item_id: &str) -> RepositoryResult<Item> {
        let before = self.item(session, item_id)?;
        if let Some(placement) = &before.placement {
            self.index_mut(session, &placement.container_id)?
                .release(item_id)?;
        }
        self.items.insert(item_id.to_string(), None);
        Ok(before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::{Coordinates, Dimensions, GEOMETRY_EPSILON};
    use crate::engine::error::EngineError;

    fn store() -> InventoryStore {
        let store = InventoryStore::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), GEOMETRY_EPSILON);
        store.add_container(Container::new("C1", "A", 100.0, 100.0, 100.0)).unwrap();
        store.add_container(Container::new("C2", "B", 50.0, 50.0, 50.0)).unwrap();
        store
    }

    fn descriptor(id: &str) -> ItemDescriptor {
        ItemDescriptor {
            item_id: id.to_string(),
            name: format!("Item {}", id),
            dimensions: Dimensions::new(10.0, 10.0, 10.0),
            mass: 2.0,
            priority: 50,
            expiry_date: None,
            usage_limit: None,
            preferred_zone: None,
        }
    }

    fn cube(at: f64) -> BoundingBox {
        BoundingBox::at(Coordinates::new(at, 0.0, 0.0), &Dimensions::new(10.0, 10.0, 10.0))
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let store = store();
        assert!(matches!(
            store.add_container(Container::new("C1", "A", 1.0, 1.0, 1.0)),
            Err(RepositoryError::UniqueConstraintViolation(_))
        ));
        store.add_item(descriptor("I1")).unwrap();
        assert!(store.add_item(descriptor("I1")).is_err());
    }

    #[test]
    fn test_staged_changes_apply_only_on_commit() {
        let store = store();
        store.add_item(descriptor("I1")).unwrap();

        // Staged but never applied: nothing changes.
        store
            .write_session(&["C1"], |session| {
                let mut staged = session.stage();
                staged.stow(session, "I1", "C1", cube(0.0))?;
                Ok(())
            })
            .unwrap();
        assert_eq!(store.get_item("I1").unwrap().state, ItemState::Unplaced);

        store
            .write_session(&["C1"], |session| {
                let mut staged = session.stage();
                staged.stow(session, "I1", "C1", cube(0.0))?;
                session.apply(staged);
                Ok(())
            })
            .unwrap();
        let item = store.get_item("I1").unwrap();
        assert_eq!(item.state, ItemState::Stowed);
        assert_eq!(item.container_id(), Some("C1"));
        assert_eq!(store.arrangement("C1").unwrap().len(), 1);
    }

    #[test]
    fn test_overlap_surfaces_as_engine_error() {
        let store = store();
        store.add_item(descriptor("I1")).unwrap();
        store.add_item(descriptor("I2")).unwrap();
        let result = store.write_session(&["C1"], |session| {
            let mut staged = session.stage();
            staged.stow(session, "I1", "C1", cube(0.0))?;
            staged.stow(session, "I2", "C1", cube(5.0))?;
            session.apply(staged);
            Ok(())
        });
        assert!(matches!(
            result,
            Err(RepositoryError::Spatial(EngineError::Overlap { .. }))
        ));
        assert_eq!(store.get_item("I1").unwrap().state, ItemState::Unplaced);
    }

    #[test]
    fn test_unknown_container_in_session_is_not_found() {
        let store = store();
        let result = store.write_session(&["NOPE"], |_| Ok(()));
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }

    #[test]
    fn test_find_by_name_ignores_case() {
        let store = store();
        store.add_item(descriptor("I7")).unwrap();
        assert_eq!(
            store.find_item_by_name("item i7").unwrap().map(|i| i.item_id),
            Some("I7".to_string())
        );
        assert!(store.find_item_by_name("other").unwrap().is_none());
    }

    #[test]
    fn test_snapshot_reports_utilization() {
        let store = store();
        store.add_item(descriptor("I1")).unwrap();
        store
            .write_session(&["C2"], |session| {
                let mut staged = session.stage();
                staged.stow(session, "I1", "C2", cube(0.0))?;
                session.apply(staged);
                Ok(())
            })
            .unwrap();
        let snapshot = store.list_containers().unwrap();
        let c2 = snapshot.iter().find(|s| s.container.container_id == "C2").unwrap();
        assert_eq!(c2.item_count, 1);
        assert!((c2.utilization - 1000.0 / 125_000.0).abs() < 1e-12);
    }
}
