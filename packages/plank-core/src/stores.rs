/// The four collections that make up a board's ordering model.
///
/// - `ItemStore`: item id -> item record
/// - `ContainerStore`: container id -> container metadata
/// - `ContainerOrder`: left-to-right container ids
/// - `ContainerItemMapping`: container id -> ordered item ids
///
/// Each is a thin serde-transparent wrapper so the persisted JSON stays a
/// plain object/array. Cross-collection consistency lives in `invariants`.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Container, Item};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemStore(BTreeMap<String, Item>);

impl ItemStore {
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.0.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Item> {
        self.0.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn insert(&mut self, item: Item) -> Option<Item> {
        self.0.insert(item.id.clone(), item)
    }

    pub fn remove(&mut self, id: &str) -> Option<Item> {
        self.0.remove(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Item> {
        self.0.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Item)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn completed_count(&self) -> usize {
        self.0.values().filter(|item| item.completed).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerStore(BTreeMap<String, Container>);

impl ContainerStore {
    pub fn get(&self, id: &str) -> Option<&Container> {
        self.0.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Container> {
        self.0.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn insert(&mut self, container: Container) -> Option<Container> {
        self.0.insert(container.id.clone(), container)
    }

    pub fn remove(&mut self, id: &str) -> Option<Container> {
        self.0.remove(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Container)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerOrder(Vec<String>);

impl ContainerOrder {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.0.iter().position(|c| c == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn push(&mut self, id: String) {
        self.0.push(id);
    }

    /// Remove `id`, returning the index it held.
    pub fn remove(&mut self, id: &str) -> Option<usize> {
        let index = self.position(id)?;
        self.0.remove(index);
        Some(index)
    }

    /// Move `id` to `to_index` (clamped). Returns the final index.
    pub fn move_to(&mut self, id: &str, to_index: usize) -> Option<usize> {
        let from = self.position(id)?;
        let moved = self.0.remove(from);
        let to = to_index.min(self.0.len());
        self.0.insert(to, moved);
        Some(to)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for ContainerOrder {
    fn from(ids: Vec<String>) -> Self {
        Self(ids)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerItemMapping(BTreeMap<String, Vec<String>>);

impl ContainerItemMapping {
    pub fn get(&self, container_id: &str) -> Option<&[String]> {
        self.0.get(container_id).map(Vec::as_slice)
    }

    pub fn get_mut(&mut self, container_id: &str) -> Option<&mut Vec<String>> {
        self.0.get_mut(container_id)
    }

    pub fn contains(&self, container_id: &str) -> bool {
        self.0.contains_key(container_id)
    }

    pub fn insert(&mut self, container_id: String, item_ids: Vec<String>) -> Option<Vec<String>> {
        self.0.insert(container_id, item_ids)
    }

    pub fn remove(&mut self, container_id: &str) -> Option<Vec<String>> {
        self.0.remove(container_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Total number of item references across all sequences.
    pub fn item_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

impl FromIterator<(String, Vec<String>)> for ContainerItemMapping {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
