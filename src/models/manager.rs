//! Tracks every collection and the active (collection, request) selection

use crate::error::{CoreError, Result};
use crate::models::collection::Collection;
use crate::models::request::Request;

/// Owns all collections. Selection is index based; an unset collection
/// implies an unset request.
#[derive(Clone, Debug, Default)]
pub struct CollectionManager {
    collections: Vec<Collection>,
    active_collection: Option<usize>,
    active_request: Option<usize>,
}

impl CollectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn collection(&self, index: usize) -> Option<&Collection> {
        self.collections.get(index)
    }

    pub fn collection_mut(&mut self, index: usize) -> Option<&mut Collection> {
        self.collections.get_mut(index)
    }

    pub fn active_collection_index(&self) -> Option<usize> {
        self.active_collection
    }

    pub fn active_request_index(&self) -> Option<usize> {
        self.active_request
    }

    pub fn active_collection(&self) -> Option<&Collection> {
        self.active_collection.and_then(|i| self.collections.get(i))
    }

    pub fn active_collection_mut(&mut self) -> Option<&mut Collection> {
        self.active_collection.and_then(|i| self.collections.get_mut(i))
    }

    pub fn active_request(&self) -> Option<&Request> {
        let request = self.active_request?;
        self.active_collection()?.request(request)
    }

    pub fn active_request_mut(&mut self) -> Option<&mut Request> {
        let request = self.active_request?;
        self.active_collection_mut()?.request_mut(request)
    }

    /// Append a collection. The first collection added becomes active.
    pub fn add_collection(&mut self, collection: Collection) -> usize {
        let has_requests = !collection.is_empty();
        self.collections.push(collection);
        let index = self.collections.len() - 1;
        if self.active_collection.is_none() {
            self.active_collection = Some(index);
            self.active_request = has_requests.then_some(0);
        }
        index
    }

    pub fn remove_collection(&mut self, index: usize) -> Result<Collection> {
        if index >= self.collections.len() {
            return Err(CoreError::invalid_index(index, self.collections.len()));
        }
        let removed = self.collections.remove(index);

        match self.active_collection {
            Some(active) if active == index => {
                if self.collections.is_empty() {
                    self.active_collection = None;
                    self.active_request = None;
                } else {
                    self.active_collection = Some(0);
                    self.active_request = (!self.collections[0].is_empty()).then_some(0);
                }
            }
            Some(active) if index < active => {
                self.active_collection = Some(active - 1);
            }
            _ => {}
        }
        Ok(removed)
    }

    /// Swap in a freshly loaded copy of a collection, keeping the selection valid.
    pub fn replace_collection(&mut self, index: usize, collection: Collection) -> Result<()> {
        let len = self.collections.len();
        let slot = self
            .collections
            .get_mut(index)
            .ok_or_else(|| CoreError::invalid_index(index, len))?;
        *slot = collection;
        if self.active_collection == Some(index) {
            let count = self.collections[index].len();
            self.active_request = match self.active_request {
                Some(r) if r < count => Some(r),
                _ if count > 0 => Some(0),
                _ => None,
            };
        }
        Ok(())
    }

    pub fn set_active_collection(&mut self, index: usize) -> Result<()> {
        let collection = self
            .collections
            .get(index)
            .ok_or_else(|| CoreError::invalid_index(index, self.collections.len()))?;
        self.active_request = (!collection.is_empty()).then_some(0);
        self.active_collection = Some(index);
        Ok(())
    }

    pub fn clear_active(&mut self) {
        self.active_collection = None;
        self.active_request = None;
    }

    /// Keep the collection selected but edit no request of it.
    pub fn clear_active_request(&mut self) {
        self.active_request = None;
    }

    pub fn set_active_request(&mut self, index: usize) -> Result<()> {
        let collection = self
            .active_collection()
            .ok_or(CoreError::NullParam("active collection"))?;
        if index >= collection.len() {
            return Err(CoreError::invalid_index(index, collection.len()));
        }
        self.active_request = Some(index);
        Ok(())
    }

    /// Re-validate the request selection after the active collection shrank.
    pub fn clamp_active_request(&mut self) {
        let count = self.active_collection().map(Collection::len).unwrap_or(0);
        self.active_request = match self.active_request {
            Some(r) if r < count => Some(r),
            Some(_) if count > 0 => Some(count - 1),
            _ => None,
        };
    }

    pub fn total_requests(&self) -> usize {
        self.collections.iter().map(Collection::len).sum()
    }

    pub fn find_collection_by_name(&self, name: &str) -> Option<usize> {
        self.collections.iter().position(|c| c.name() == name)
    }

    pub fn find_collection_by_id(&self, id: &str) -> Option<usize> {
        self.collections.iter().position(|c| c.id == id)
    }
}
