#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

use nalgebra::RealField;

use crate::{ExteriorOrientation, InteriorOrientation};

/// A frame camera mounted on a platform.
///
/// In a multi-camera rig one camera is the reference camera. Its mounting
/// parameters are the transform from its camera frame to the platform body
/// frame. Every other camera stores the transform from its own frame to the
/// frame of the reference camera. A camera knows the id of its reference
/// camera but not its own id, which is the key it is stored under in an
/// [`ImageBlock`](crate::ImageBlock).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FrameCamera<R: RealField = f64, const N: usize = 9> {
    reference_camera_id: String,
    mounting_parameters: ExteriorOrientation<R>,
    iops: InteriorOrientation<R, N>,
}

impl<R: RealField, const N: usize> Default for FrameCamera<R, N> {
    fn default() -> Self {
        Self {
            reference_camera_id: String::new(),
            mounting_parameters: ExteriorOrientation::default(),
            iops: InteriorOrientation::default(),
        }
    }
}

impl<R: RealField, const N: usize> FrameCamera<R, N> {
    /// Construct a camera from its reference camera id, mounting parameters
    /// and interior orientation.
    pub fn new(
        reference_camera_id: impl Into<String>,
        mounting_parameters: ExteriorOrientation<R>,
        iops: InteriorOrientation<R, N>,
    ) -> Self {
        Self {
            reference_camera_id: reference_camera_id.into(),
            mounting_parameters,
            iops,
        }
    }

    /// The id of the reference camera of the rig.
    #[inline]
    pub fn reference_camera_id(&self) -> &str {
        &self.reference_camera_id
    }

    /// Return `true` if the camera stored under `own_id` is the reference camera.
    #[inline]
    pub fn is_reference_camera(&self, own_id: &str) -> bool {
        self.reference_camera_id == own_id
    }

    /// The mounting parameters.
    #[inline]
    pub fn mounting_parameters(&self) -> &ExteriorOrientation<R> {
        &self.mounting_parameters
    }

    /// The mounting parameters (mutable reference).
    #[inline]
    pub fn mounting_parameters_mut(&mut self) -> &mut ExteriorOrientation<R> {
        &mut self.mounting_parameters
    }

    /// The interior orientation parameters.
    #[inline]
    pub fn iops(&self) -> &InteriorOrientation<R, N> {
        &self.iops
    }

    /// The interior orientation parameters (mutable reference).
    #[inline]
    pub fn iops_mut(&mut self) -> &mut InteriorOrientation<R, N> {
        &mut self.iops
    }
}
