//! The collinearity condition linking an object point, a chain of
//! orientations and an image measurement.
//!
//! The camera frame has x right, y up and the camera looks along -z. An
//! object point `P` in the mapping frame is moved into the camera frame by
//! the inverse of the camera to mapping transform, `p = R^T (P - t)`, and
//! projected as
//!
//! ```text
//! x = xp - c * p.x / p.z + dx
//! y = yp - c * p.y / p.z + dy
//! ```
//!
//! where `(dx, dy)` is the lens distortion evaluated at the observed image
//! coordinate. Evaluating distortion at the observation keeps the prediction
//! in closed form, so it can be differentiated with respect to all
//! parameters by an automatic differentiation solver.

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

use nalgebra::{convert, zero, Matrix3, RealField, Vector2, Vector3};

use crate::{
    DistortionCoefficients, DistortionModel, Error, ExteriorOrientation, InteriorOrientation,
    Result,
};

/// Compose the camera to mapping transform of a camera in a rig.
///
/// `camera_to_ref` is the mounting of the camera relative to the reference
/// camera (the identity when the camera is the reference camera itself),
/// `ref_to_body` the mounting of the reference camera on the platform and
/// `body_to_mapping` the platform pose at the time of exposure.
pub fn camera_to_mapping<R: RealField>(
    camera_to_ref: &ExteriorOrientation<R>,
    ref_to_body: &ExteriorOrientation<R>,
    body_to_mapping: &ExteriorOrientation<R>,
) -> ExteriorOrientation<R> {
    camera_to_ref
        .transform_to(ref_to_body)
        .transform_to(body_to_mapping)
}

/// A rigid transform as rotation matrix and translation.
struct Transform<R: RealField> {
    rotation: Matrix3<R>,
    translation: Vector3<R>,
}

impl<R: RealField> Transform<R> {
    fn from_eop(eop: &ExteriorOrientation<R>) -> Self {
        Self {
            rotation: eop.rotation_matrix(),
            translation: eop.translation().coords().clone(),
        }
    }

    /// `[tx, ty, tz, omega, phi, kappa]`, angles in radians.
    fn from_packed(pose: &[R]) -> Self {
        let angles = Vector3::new(pose[3].clone(), pose[4].clone(), pose[5].clone());
        Self {
            rotation: ExteriorOrientation::rotation_matrix_from_euler_radians(&angles),
            translation: Vector3::new(pose[0].clone(), pose[1].clone(), pose[2].clone()),
        }
    }

    /// Apply `self` first, then `other`.
    fn then(self, other: &Self) -> Self {
        Self {
            translation: &other.translation + &other.rotation * self.translation,
            rotation: &other.rotation * self.rotation,
        }
    }

    fn inverse_transform_point(&self, point: &Vector3<R>) -> Vector3<R> {
        self.rotation.tr_mul(&(point - &self.translation))
    }
}

/// Project `object_point` with the camera to mapping transform given by the
/// three orientations. `observed` are image coordinates.
fn project<R: RealField>(
    xyc: (R, R, R),
    coefficients: &DistortionCoefficients<R>,
    object_point: &Vector3<R>,
    camera_to_mapping: &Transform<R>,
    observed: &Vector2<R>,
) -> Option<Vector2<R>> {
    let (xp, yp, c) = xyc;
    let p = camera_to_mapping.inverse_transform_point(object_point);
    if p.z == zero::<R>() {
        return None;
    }
    let distortion = coefficients.evaluate(
        observed.x.clone() - xp.clone(),
        observed.y.clone() - yp.clone(),
    );
    let x = xp - c.clone() * p.x.clone() / p.z.clone() + distortion.x.clone();
    let y = yp - c * p.y.clone() / p.z.clone() + distortion.y.clone();
    Some(Vector2::new(x, y))
}

/// Predict the image coordinate of `object_point` (mapping frame).
///
/// `observed` is the measured image coordinate (see
/// [`InteriorOrientation::convert_pixel_to_image_coordinates`]), needed to
/// evaluate the lens distortion. Returns `Err(Error::InvalidInput)` if the
/// point lies in the plane `z = 0` of the camera frame.
pub fn project_object_point<R: RealField, const N: usize>(
    iops: &InteriorOrientation<R, N>,
    object_point: &Vector3<R>,
    body_to_mapping: &ExteriorOrientation<R>,
    ref_to_body: &ExteriorOrientation<R>,
    camera_to_ref: &ExteriorOrientation<R>,
    observed: &Vector2<R>,
) -> Result<Vector2<R>> {
    let transform = Transform::from_eop(camera_to_ref)
        .then(&Transform::from_eop(ref_to_body))
        .then(&Transform::from_eop(body_to_mapping));
    project(
        (iops.xp(), iops.yp(), iops.c()),
        &iops.coefficients(),
        object_point,
        &transform,
        observed,
    )
    .ok_or(Error::InvalidInput)
}

/// The observed minus the predicted image coordinate.
///
/// See [`project_object_point`].
pub fn collinearity_residual<R: RealField, const N: usize>(
    iops: &InteriorOrientation<R, N>,
    object_point: &Vector3<R>,
    body_to_mapping: &ExteriorOrientation<R>,
    ref_to_body: &ExteriorOrientation<R>,
    camera_to_ref: &ExteriorOrientation<R>,
    observed: &Vector2<R>,
) -> Result<Vector2<R>> {
    let predicted = project_object_point(
        iops,
        object_point,
        body_to_mapping,
        ref_to_body,
        camera_to_ref,
        observed,
    )?;
    Ok(observed - predicted)
}

/// Collinearity cost function over packed parameter blocks.
///
/// One instance holds one image measurement. [`evaluate`](Self::evaluate) is
/// generic over the scalar type so that a non-linear least-squares solver can
/// call it with dual numbers to obtain Jacobians.
///
/// Parameter blocks:
///
/// - camera IOPs: `[xp, yp, c, d0, .., d(n-1)]`, the distortion parameters
///   laid out according to `model`
/// - object point: `[X, Y, Z]` in the mapping frame
/// - poses: `[tx, ty, tz, omega, phi, kappa]`, angles in radians, as produced
///   by [`ExteriorOrientation::to_parameters`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CollinearityResidual {
    /// The measured image coordinate.
    pub observed: Vector2<f64>,
    /// The layout of the distortion parameters in the camera block.
    pub model: DistortionModel,
}

impl CollinearityResidual {
    /// The number of residuals.
    pub const NUM_RESIDUALS: usize = 2;
    /// The length of a pose parameter block.
    pub const POSE_PARAMETERS: usize = 6;
    /// The length of an object point parameter block.
    pub const POINT_PARAMETERS: usize = 3;

    /// Create a cost function for the measured image coordinate `(x, y)`.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            observed: Vector2::new(x, y),
            model: DistortionModel::default(),
        }
    }

    /// Use `model` to interpret the distortion parameters.
    pub fn with_model(mut self, model: DistortionModel) -> Self {
        self.model = model;
        self
    }

    /// Fill `residuals` with the observed minus the predicted image coordinate.
    ///
    /// `non_ref_camera_to_ref` is the identity pose (all zeros) for
    /// measurements of the reference camera. Returns `false` if a parameter
    /// block has the wrong length or the object point lies in the plane
    /// `z = 0` of the camera frame.
    pub fn evaluate<T: RealField>(
        &self,
        camera_iops: &[T],
        object_point: &[T],
        body_frame_eops: &[T],
        ref_camera_to_body: &[T],
        non_ref_camera_to_ref: &[T],
        residuals: &mut [T],
    ) -> bool {
        if camera_iops.len() < 3
            || object_point.len() != Self::POINT_PARAMETERS
            || body_frame_eops.len() != Self::POSE_PARAMETERS
            || ref_camera_to_body.len() != Self::POSE_PARAMETERS
            || non_ref_camera_to_ref.len() != Self::POSE_PARAMETERS
            || residuals.len() != Self::NUM_RESIDUALS
        {
            return false;
        }

        let transform = Transform::from_packed(non_ref_camera_to_ref)
            .then(&Transform::from_packed(ref_camera_to_body))
            .then(&Transform::from_packed(body_frame_eops));
        let point = Vector3::new(
            object_point[0].clone(),
            object_point[1].clone(),
            object_point[2].clone(),
        );
        let observed: Vector2<T> = Vector2::new(convert(self.observed.x), convert(self.observed.y));
        let coefficients = DistortionCoefficients::from_slice(self.model, &camera_iops[3..]);

        match project(
            (
                camera_iops[0].clone(),
                camera_iops[1].clone(),
                camera_iops[2].clone(),
            ),
            &coefficients,
            &point,
            &transform,
            &observed,
        ) {
            Some(predicted) => {
                residuals[0] = observed.x.clone() - predicted.x.clone();
                residuals[1] = observed.y.clone() - predicted.y.clone();
                true
            }
            None => false,
        }
    }
}
