use std::path::{Path, PathBuf};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

use nalgebra::RealField;

use crate::{ExteriorOrientation, ImagePoint, PointCloud, Result};

/// An image: the camera that took it, its pose and its measured points.
///
/// The pose is the body frame to mapping frame transform at the time of
/// exposure. When the image carries a time tag, the navigation data of an
/// [`ImageBlock`](crate::ImageBlock) can supply that pose instead (see
/// [`FrameImageBlock::body_pose`](crate::FrameImageBlock::body_pose)).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Image<P, R: RealField = f64> {
    camera_id: String,
    eop: ExteriorOrientation<R>,
    file_path: Option<PathBuf>,
    time_tag: Option<u64>,
    points: PointCloud<P>,
}

/// An image measured by a frame camera.
pub type FrameImage<R = f64> = Image<ImagePoint<R>, R>;

impl<P, R: RealField> Image<P, R> {
    /// Construct an image without points.
    pub fn new(camera_id: impl Into<String>, eop: ExteriorOrientation<R>) -> Self {
        Self {
            camera_id: camera_id.into(),
            eop,
            file_path: None,
            time_tag: None,
            points: PointCloud::new(),
        }
    }

    /// Set the path of the image file.
    pub fn with_file_path(mut self, file_path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    /// Set the exposure time, used as key into the navigation data.
    pub fn with_time_tag(mut self, time_tag: u64) -> Self {
        self.time_tag = Some(time_tag);
        self
    }

    /// The id of the camera that took this image.
    #[inline]
    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    /// The exterior orientation.
    #[inline]
    pub fn eop(&self) -> &ExteriorOrientation<R> {
        &self.eop
    }

    /// The exterior orientation (mutable reference).
    #[inline]
    pub fn eop_mut(&mut self) -> &mut ExteriorOrientation<R> {
        &mut self.eop
    }

    /// The path of the image file, if known.
    #[inline]
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// The exposure time, if known.
    #[inline]
    pub fn time_tag(&self) -> Option<u64> {
        self.time_tag
    }

    /// Add a measured point. Returns `false` if `point_id` is already present.
    pub fn add_point(&mut self, point_id: impl Into<String>, point: P) -> bool {
        self.points.add_point(point_id, point)
    }

    /// Get the measured point `point_id`.
    pub fn get_point(&self, point_id: &str) -> Result<&P> {
        self.points.get_point(point_id)
    }

    /// Delete the measured point `point_id`. Returns `true` if it existed.
    pub fn delete_point(&mut self, point_id: &str) -> bool {
        self.points.delete_point(point_id)
    }

    /// The number of measured points.
    #[inline]
    pub fn number_of_points(&self) -> usize {
        self.points.number_of_points()
    }

    /// Iterate over the measured points.
    pub fn image_points(&self) -> impl Iterator<Item = (&str, &P)> + '_ {
        self.points.iter().map(|(id, p)| (id.as_str(), p))
    }

    /// The measured points.
    #[inline]
    pub fn point_cloud(&self) -> &PointCloud<P> {
        &self.points
    }

    /// The measured points (mutable reference).
    #[inline]
    pub fn point_cloud_mut(&mut self) -> &mut PointCloud<P> {
        &mut self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use nalgebra::Vector3;

    #[test]
    fn image_points() {
        let eop = ExteriorOrientation::new(
            Vector3::new(100.0, 200.0, 1500.0),
            Vector3::new(1.0, -2.0, 90.0),
            true,
        );
        let mut image: FrameImage = Image::new("nadir", eop)
            .with_file_path("flight1/IMG_0001.tif")
            .with_time_tag(1_000_123);
        assert_eq!(image.camera_id(), "nadir");
        assert_eq!(image.time_tag(), Some(1_000_123));
        assert_eq!(image.file_path(), Some(Path::new("flight1/IMG_0001.tif")));

        assert!(image.add_point("1", ImagePoint::new(10.5, 20.5, "1")));
        assert!(image.add_point("2", ImagePoint::new(30.0, 40.0, "2")));
        assert!(!image.add_point("2", ImagePoint::new(0.0, 0.0, "2")));
        assert_eq!(image.number_of_points(), 2);
        assert_eq!(image.get_point("2").unwrap().col(), 30.0);
        assert!(matches!(image.get_point("3"), Err(Error::NotFound { .. })));

        let mut ids: Vec<&str> = image.image_points().map(|(id, _)| id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["1", "2"]);

        assert!(image.delete_point("1"));
        assert!(!image.delete_point("1"));
        assert_eq!(image.point_cloud().number_of_points(), 1);
    }

    #[test]
    fn pose_is_mutable() {
        let mut image: FrameImage = Image::new("nadir", ExteriorOrientation::identity());
        assert_eq!(image.time_tag(), None);
        assert_eq!(image.file_path(), None);
        image.eop_mut().set_rotation(0.0, 0.0, 180.0, true);
        assert_eq!(image.eop().rotation()[2], 180.0);
    }
}
