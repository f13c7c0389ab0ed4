use std::collections::{hash_map, HashMap};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

use crate::{EntityKind, Error, Result};

/// A collection of points keyed by a unique string id.
///
/// Each point is owned by the cloud that holds it. Inserting an id that is
/// already present is rejected rather than overwriting the stored point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PointCloud<P> {
    points: HashMap<String, P>,
}

impl<P> Default for PointCloud<P> {
    fn default() -> Self {
        Self {
            points: HashMap::new(),
        }
    }
}

impl<P> PointCloud<P> {
    /// Construct an empty point cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `point` under `point_id`.
    ///
    /// Returns `false` without modifying the cloud if `point_id` is already
    /// present.
    pub fn add_point(&mut self, point_id: impl Into<String>, point: P) -> bool {
        match self.points.entry(point_id.into()) {
            hash_map::Entry::Occupied(entry) => {
                log::debug!("point `{}` already in point cloud", entry.key());
                false
            }
            hash_map::Entry::Vacant(entry) => {
                entry.insert(point);
                true
            }
        }
    }

    /// Delete the point stored under `point_id`.
    ///
    /// Returns `true` if a point was removed.
    pub fn delete_point(&mut self, point_id: &str) -> bool {
        self.points.remove(point_id).is_some()
    }

    /// Get the point stored under `point_id`.
    ///
    /// Returns `Err(Error::NotFound)` for an unknown id.
    pub fn get_point(&self, point_id: &str) -> Result<&P> {
        self.points
            .get(point_id)
            .ok_or_else(|| Error::not_found(EntityKind::Point, point_id))
    }

    /// Get the point stored under `point_id` (mutable reference).
    ///
    /// Returns `Err(Error::NotFound)` for an unknown id.
    pub fn get_point_mut(&mut self, point_id: &str) -> Result<&mut P> {
        self.points
            .get_mut(point_id)
            .ok_or_else(|| Error::not_found(EntityKind::Point, point_id))
    }

    /// Return `true` if a point is stored under `point_id`.
    #[inline]
    pub fn contains_point(&self, point_id: &str) -> bool {
        self.points.contains_key(point_id)
    }

    /// The number of points.
    #[inline]
    pub fn number_of_points(&self) -> usize {
        self.points.len()
    }

    /// All points, keyed by id.
    #[inline]
    pub fn points(&self) -> &HashMap<String, P> {
        &self.points
    }

    /// Iterate over `(id, point)` pairs in arbitrary order.
    #[inline]
    pub fn iter(&self) -> hash_map::Iter<'_, String, P> {
        self.points.iter()
    }
}

impl<'a, P> IntoIterator for &'a PointCloud<P> {
    type Item = (&'a String, &'a P);
    type IntoIter = hash_map::Iter<'a, String, P>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
