use std::{
    cell::RefCell,
    collections::{hash_map, HashMap},
    fmt::Display,
    hash::Hash,
    rc::Rc,
};

use nalgebra::{RealField, Vector2};

use crate::{
    collinearity_residual, EntityKind, Error, ExteriorOrientation, FrameCamera, FrameImage,
    ObjectPoint, Result,
};

/// A handle to an entry of an [`ImageBlock`].
///
/// Entries are shared between the block and its users. Mutating an entry
/// through a handle is seen by everyone holding it.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wrap `value` in a [`Shared`] handle.
#[inline]
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// The registry of cameras, images, object points and navigation samples
/// making up a photogrammetric block.
///
/// Cameras, images and object points are keyed by string ids, navigation
/// samples (body frame to mapping frame poses from GNSS/INS) by their
/// timestamp. Adding an id that is already present returns `false` and
/// leaves the block unchanged. Removing an entry does not remove anything
/// that refers to it.
#[derive(Debug)]
pub struct ImageBlock<C, I, O, R: RealField = f64> {
    cameras: HashMap<String, Shared<C>>,
    images: HashMap<String, Shared<I>>,
    object_points: HashMap<String, Shared<O>>,
    navigation_data: HashMap<u64, Shared<ExteriorOrientation<R>>>,
}

/// An [`ImageBlock`] of frame cameras.
pub type FrameImageBlock<R = f64, const N: usize = 9> =
    ImageBlock<FrameCamera<R, N>, FrameImage<R>, ObjectPoint<R>, R>;

impl<C, I, O, R: RealField> Default for ImageBlock<C, I, O, R> {
    fn default() -> Self {
        Self {
            cameras: HashMap::new(),
            images: HashMap::new(),
            object_points: HashMap::new(),
            navigation_data: HashMap::new(),
        }
    }
}

fn insert<K: Eq + Hash + Display, V>(
    map: &mut HashMap<K, Shared<V>>,
    kind: EntityKind,
    key: K,
    value: Shared<V>,
) -> bool {
    match map.entry(key) {
        hash_map::Entry::Occupied(entry) => {
            log::debug!("{} `{}` already in image block", kind, entry.key());
            false
        }
        hash_map::Entry::Vacant(entry) => {
            entry.insert(value);
            true
        }
    }
}

fn lookup<K, Q, V>(map: &HashMap<K, Shared<V>>, kind: EntityKind, key: &Q) -> Result<Shared<V>>
where
    K: Eq + Hash + std::borrow::Borrow<Q>,
    Q: Eq + Hash + Display + ?Sized,
{
    map.get(key)
        .cloned()
        .ok_or_else(|| Error::not_found(kind, key))
}

impl<C, I, O, R: RealField> ImageBlock<C, I, O, R> {
    /// Construct an empty image block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a camera. Returns `false` if `camera_id` is already present.
    pub fn add_camera(&mut self, camera_id: impl Into<String>, camera: Shared<C>) -> bool {
        insert(&mut self.cameras, EntityKind::Camera, camera_id.into(), camera)
    }

    /// Get the camera `camera_id`.
    pub fn camera(&self, camera_id: &str) -> Result<Shared<C>> {
        lookup(&self.cameras, EntityKind::Camera, camera_id)
    }

    /// Remove the camera `camera_id`. Returns `true` if it existed.
    pub fn remove_camera(&mut self, camera_id: &str) -> bool {
        self.cameras.remove(camera_id).is_some()
    }

    /// The number of cameras.
    pub fn number_of_cameras(&self) -> usize {
        self.cameras.len()
    }

    /// Iterate over all cameras in arbitrary order.
    pub fn cameras(&self) -> impl Iterator<Item = (&str, &Shared<C>)> + '_ {
        self.cameras.iter().map(|(id, c)| (id.as_str(), c))
    }

    /// Add an image. Returns `false` if `image_id` is already present.
    pub fn add_image(&mut self, image_id: impl Into<String>, image: Shared<I>) -> bool {
        insert(&mut self.images, EntityKind::Image, image_id.into(), image)
    }

    /// Get the image `image_id`.
    pub fn image(&self, image_id: &str) -> Result<Shared<I>> {
        lookup(&self.images, EntityKind::Image, image_id)
    }

    /// Remove the image `image_id`. Returns `true` if it existed.
    pub fn remove_image(&mut self, image_id: &str) -> bool {
        self.images.remove(image_id).is_some()
    }

    /// The number of images.
    pub fn number_of_images(&self) -> usize {
        self.images.len()
    }

    /// Iterate over all images in arbitrary order.
    pub fn images(&self) -> impl Iterator<Item = (&str, &Shared<I>)> + '_ {
        self.images.iter().map(|(id, i)| (id.as_str(), i))
    }

    /// Add an object point. Returns `false` if `point_id` is already present.
    pub fn add_object_point(&mut self, point_id: impl Into<String>, point: Shared<O>) -> bool {
        insert(
            &mut self.object_points,
            EntityKind::ObjectPoint,
            point_id.into(),
            point,
        )
    }

    /// Get the object point `point_id`.
    pub fn object_point(&self, point_id: &str) -> Result<Shared<O>> {
        lookup(&self.object_points, EntityKind::ObjectPoint, point_id)
    }

    /// Remove the object point `point_id`. Returns `true` if it existed.
    pub fn remove_object_point(&mut self, point_id: &str) -> bool {
        self.object_points.remove(point_id).is_some()
    }

    /// The number of object points.
    pub fn number_of_object_points(&self) -> usize {
        self.object_points.len()
    }

    /// Iterate over all object points in arbitrary order.
    pub fn object_points(&self) -> impl Iterator<Item = (&str, &Shared<O>)> + '_ {
        self.object_points.iter().map(|(id, p)| (id.as_str(), p))
    }

    /// Add the body to mapping pose at `timestamp`. Returns `false` if a sample
    /// at `timestamp` is already present.
    pub fn add_navigation(
        &mut self,
        timestamp: u64,
        body_to_mapping: Shared<ExteriorOrientation<R>>,
    ) -> bool {
        insert(
            &mut self.navigation_data,
            EntityKind::Navigation,
            timestamp,
            body_to_mapping,
        )
    }

    /// Get the navigation sample at `timestamp`.
    pub fn navigation(&self, timestamp: u64) -> Result<Shared<ExteriorOrientation<R>>> {
        lookup(&self.navigation_data, EntityKind::Navigation, &timestamp)
    }

    /// Remove the navigation sample at `timestamp`. Returns `true` if it existed.
    pub fn remove_navigation(&mut self, timestamp: u64) -> bool {
        self.navigation_data.remove(&timestamp).is_some()
    }

    /// The number of navigation samples.
    pub fn number_of_navigation_samples(&self) -> usize {
        self.navigation_data.len()
    }

    /// Iterate over all navigation samples in arbitrary order.
    pub fn navigation_data(
        &self,
    ) -> impl Iterator<Item = (u64, &Shared<ExteriorOrientation<R>>)> + '_ {
        self.navigation_data.iter().map(|(t, eop)| (*t, eop))
    }
}

impl<R: RealField, const N: usize> FrameImageBlock<R, N> {
    /// The camera to reference camera and reference camera to body mountings
    /// of `camera_id`.
    fn mountings(
        &self,
        camera_id: &str,
    ) -> Result<(ExteriorOrientation<R>, ExteriorOrientation<R>)> {
        let camera = self.camera(camera_id)?;
        let camera = camera.borrow();
        if camera.is_reference_camera(camera_id) {
            return Ok((
                ExteriorOrientation::identity(),
                camera.mounting_parameters().clone(),
            ));
        }
        let reference = self.camera(camera.reference_camera_id())?;
        let reference = reference.borrow();
        Ok((
            camera.mounting_parameters().clone(),
            reference.mounting_parameters().clone(),
        ))
    }

    /// The transform from the frame of camera `camera_id` to the body frame.
    ///
    /// For a camera other than the reference camera this chains its mounting
    /// through the mounting of its reference camera.
    pub fn camera_to_body(&self, camera_id: &str) -> Result<ExteriorOrientation<R>> {
        let (camera_to_ref, ref_to_body) = self.mountings(camera_id)?;
        Ok(camera_to_ref.transform_to(&ref_to_body))
    }

    /// The body to mapping pose of the platform when image `image_id` was
    /// taken.
    ///
    /// This is the navigation sample at the time tag of the image if it has
    /// one (`Err(Error::NotFound)` if there is no such sample) and the pose
    /// stored with the image otherwise.
    pub fn body_pose(&self, image_id: &str) -> Result<ExteriorOrientation<R>> {
        let image = self.image(image_id)?;
        let image = image.borrow();
        let pose = match image.time_tag() {
            Some(timestamp) => self.navigation(timestamp)?.borrow().clone(),
            None => image.eop().clone(),
        };
        Ok(pose)
    }

    /// The collinearity residual (observed minus predicted image coordinate)
    /// of one measurement.
    pub fn observation_residual(
        &self,
        image_id: &str,
        image_point_id: &str,
        object_point_id: &str,
    ) -> Result<Vector2<R>> {
        let image = self.image(image_id)?;
        let image = image.borrow();
        let camera = self.camera(image.camera_id())?;
        let camera = camera.borrow();
        let (camera_to_ref, ref_to_body) = self.mountings(image.camera_id())?;
        let body_to_mapping = self.body_pose(image_id)?;
        let object_point = self.object_point(object_point_id)?;
        let object_point = object_point.borrow();

        let image_point = image.get_point(image_point_id)?;
        let iops = camera.iops();
        let observed =
            iops.convert_pixel_to_image_coordinates(image_point.row(), image_point.col());
        collinearity_residual(
            iops,
            object_point.coords(),
            &body_to_mapping,
            &ref_to_body,
            &camera_to_ref,
            &observed,
        )
    }

    /// The residuals of all measurements of object point `point_id`, as
    /// `(image_id, residual)` sorted by image id.
    pub fn object_point_residuals(&self, point_id: &str) -> Result<Vec<(String, Vector2<R>)>> {
        let object_point = self.object_point(point_id)?;
        let mut observations: Vec<(String, String)> = object_point
            .borrow()
            .observations()
            .iter()
            .map(|(image_id, image_point_id)| (image_id.clone(), image_point_id.clone()))
            .collect();
        observations.sort();

        observations
            .into_iter()
            .map(|(image_id, image_point_id)| {
                let residual = self.observation_residual(&image_id, &image_point_id, point_id)?;
                Ok((image_id, residual))
            })
            .collect()
    }
}
