#[cfg(feature = "std")]
use std::collections::HashMap;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

use nalgebra::{RealField, SMatrix, SVector};

#[cfg(feature = "std")]
use nalgebra::{Vector2, Vector3};

/// An `D`-dimensional vector with its `D x D` variance-covariance matrix.
///
/// This is the base of every coordinate entity in the crate: image points,
/// object points, and the translation and rotation parts of an
/// [`ExteriorOrientation`](crate::ExteriorOrientation). The covariance is
/// assumed to be symmetric positive semi-definite but this is not checked.
///
/// `Point` dereferences to the underlying `nalgebra` vector, so `point[0]`
/// and all vector arithmetic work directly.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Point<R: RealField, const D: usize> {
    coords: SVector<R, D>,
    covariance: SMatrix<R, D, D>,
}

impl<R: RealField, const D: usize> Point<R, D> {
    /// Construct a point with an identity covariance matrix.
    #[inline]
    pub fn new(coords: SVector<R, D>) -> Self {
        Self::with_covariance(coords, SMatrix::identity())
    }

    /// Construct a point with an explicit covariance matrix.
    #[inline]
    pub fn with_covariance(coords: SVector<R, D>, covariance: SMatrix<R, D, D>) -> Self {
        Self { coords, covariance }
    }

    /// The coordinates.
    #[inline]
    pub fn coords(&self) -> &SVector<R, D> {
        &self.coords
    }

    /// The coordinates (mutable reference).
    #[inline]
    pub fn coords_mut(&mut self) -> &mut SVector<R, D> {
        &mut self.coords
    }

    /// The variance-covariance matrix.
    #[inline]
    pub fn covariance(&self) -> &SMatrix<R, D, D> {
        &self.covariance
    }

    /// The variance-covariance matrix (mutable reference).
    #[inline]
    pub fn covariance_mut(&mut self) -> &mut SMatrix<R, D, D> {
        &mut self.covariance
    }
}

impl<R: RealField, const D: usize> Default for Point<R, D> {
    fn default() -> Self {
        Self::new(SVector::zeros())
    }
}

impl<R: RealField, const D: usize> From<SVector<R, D>> for Point<R, D> {
    #[inline]
    fn from(coords: SVector<R, D>) -> Self {
        Self::new(coords)
    }
}

impl<R: RealField, const D: usize> std::ops::Deref for Point<R, D> {
    type Target = SVector<R, D>;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.coords
    }
}

impl<R: RealField, const D: usize> std::ops::DerefMut for Point<R, D> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.coords
    }
}

/// A 2D image point with its variance-covariance matrix.
///
/// The coordinates are pixel coordinates with the origin at the upper left
/// corner of the image: `point[0]` is the column and `point[1]` the row.
#[cfg(feature = "std")]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ImagePoint<R: RealField = f64> {
    point_id: String,
    point: Point<R, 2>,
}

#[cfg(feature = "std")]
impl<R: RealField> ImagePoint<R> {
    /// Construct an image point with an identity covariance matrix.
    pub fn new(col: R, row: R, point_id: impl Into<String>) -> Self {
        Self::with_covariance(col, row, point_id, SMatrix::identity())
    }

    /// Construct an image point with an explicit covariance matrix.
    pub fn with_covariance(
        col: R,
        row: R,
        point_id: impl Into<String>,
        covariance: SMatrix<R, 2, 2>,
    ) -> Self {
        Self {
            point_id: point_id.into(),
            point: Point::with_covariance(Vector2::new(col, row), covariance),
        }
    }

    /// The id of this point.
    #[inline]
    pub fn point_id(&self) -> &str {
        &self.point_id
    }

    /// The column coordinate.
    #[inline]
    pub fn col(&self) -> R {
        self.point[0].clone()
    }

    /// The row coordinate.
    #[inline]
    pub fn row(&self) -> R {
        self.point[1].clone()
    }

    /// The coordinates with their covariance.
    #[inline]
    pub fn point(&self) -> &Point<R, 2> {
        &self.point
    }

    /// The coordinates with their covariance (mutable reference).
    #[inline]
    pub fn point_mut(&mut self) -> &mut Point<R, 2> {
        &mut self.point
    }
}

#[cfg(feature = "std")]
impl<R: RealField> std::ops::Deref for ImagePoint<R> {
    type Target = Point<R, 2>;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.point
    }
}

/// A 3D object point in the mapping frame with its variance-covariance matrix.
///
/// An object point also records in which images it was observed: for every
/// image id it stores the id of the corresponding image point (the tie point
/// links of the block).
#[cfg(feature = "std")]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ObjectPoint<R: RealField = f64> {
    point_id: String,
    point: Point<R, 3>,
    observations: HashMap<String, String>,
}

#[cfg(feature = "std")]
impl<R: RealField> ObjectPoint<R> {
    /// Construct an object point with an identity covariance matrix.
    pub fn new(x: R, y: R, z: R, point_id: impl Into<String>) -> Self {
        Self::with_covariance(x, y, z, point_id, SMatrix::identity())
    }

    /// Construct an object point with an explicit covariance matrix.
    pub fn with_covariance(
        x: R,
        y: R,
        z: R,
        point_id: impl Into<String>,
        covariance: SMatrix<R, 3, 3>,
    ) -> Self {
        Self {
            point_id: point_id.into(),
            point: Point::with_covariance(Vector3::new(x, y, z), covariance),
            observations: HashMap::new(),
        }
    }

    /// The id of this point.
    #[inline]
    pub fn point_id(&self) -> &str {
        &self.point_id
    }

    /// The coordinates with their covariance.
    #[inline]
    pub fn point(&self) -> &Point<R, 3> {
        &self.point
    }

    /// The coordinates with their covariance (mutable reference).
    #[inline]
    pub fn point_mut(&mut self) -> &mut Point<R, 3> {
        &mut self.point
    }

    /// Record that this point was observed as `image_point_id` in `image_id`.
    ///
    /// Returns `false`, leaving the existing link untouched, if an observation
    /// in `image_id` is already recorded.
    pub fn add_observation(
        &mut self,
        image_id: impl Into<String>,
        image_point_id: impl Into<String>,
    ) -> bool {
        use std::collections::hash_map::Entry;
        match self.observations.entry(image_id.into()) {
            Entry::Occupied(entry) => {
                log::debug!(
                    "object point `{}` already observed in image `{}`",
                    self.point_id,
                    entry.key()
                );
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(image_point_id.into());
                true
            }
        }
    }

    /// The image point id observing this point in `image_id`, if any.
    pub fn observation(&self, image_id: &str) -> Option<&str> {
        self.observations.get(image_id).map(String::as_str)
    }

    /// Remove the observation in `image_id`. Returns `true` if it existed.
    pub fn remove_observation(&mut self, image_id: &str) -> bool {
        self.observations.remove(image_id).is_some()
    }

    /// All observations, keyed by image id.
    #[inline]
    pub fn observations(&self) -> &HashMap<String, String> {
        &self.observations
    }

    /// The number of images observing this point.
    #[inline]
    pub fn number_of_observations(&self) -> usize {
        self.observations.len()
    }
}

#[cfg(feature = "std")]
impl<R: RealField> std::ops::Deref for ObjectPoint<R> {
    type Target = Point<R, 3>;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.point
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix3, Vector3};

    #[test]
    fn default_covariance_is_identity() {
        let p = Point::<f64, 3>::new(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(p.covariance(), &Matrix3::identity());

        let q = Point::<f32, 5>::default();
        assert_eq!(q.covariance(), &SMatrix::<f32, 5, 5>::identity());
        assert_eq!(q.coords(), &SVector::<f32, 5>::zeros());
    }

    #[test]
    fn deref_to_vector() {
        let mut p = Point::<f64, 3>::new(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(p[1], 2.0);
        p[2] = 4.0;
        assert_eq!(p.coords(), &Vector3::new(1.0, 2.0, 4.0));
        assert_eq!(p.norm(), 21.0f64.sqrt());
    }

    #[cfg(feature = "std")]
    #[test]
    fn image_point() {
        let point = ImagePoint::new(0.1, 0.2, "1");
        assert_eq!(point[0], 0.1);
        assert_eq!(point[1], 0.2);
        assert_eq!(point.col(), 0.1);
        assert_eq!(point.row(), 0.2);
        assert_eq!(point.point_id(), "1");
        assert_eq!(point.covariance(), &SMatrix::<f64, 2, 2>::identity());
    }

    #[cfg(feature = "std")]
    #[test]
    fn object_point_observations() {
        let mut point = ObjectPoint::new(1.0, 2.0, 3.0, "tie");
        assert_eq!(point.number_of_observations(), 0);
        assert!(point.add_observation("image1", "a"));
        assert!(point.add_observation("image2", "b"));
        assert!(!point.add_observation("image1", "c"));
        assert_eq!(point.observation("image1"), Some("a"));
        assert_eq!(point.observation("image3"), None);
        assert_eq!(point.number_of_observations(), 2);
        assert!(point.remove_observation("image2"));
        assert!(!point.remove_observation("image2"));
        assert_eq!(point.number_of_observations(), 1);
        assert_eq!(point[2], 3.0);
    }
}
