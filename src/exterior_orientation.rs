#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

use nalgebra::{convert, one, zero, Matrix3, RealField, Vector3};

use crate::{Error, Point, Result};

#[inline]
fn degrees_to_radians_factor<R: RealField>() -> R {
    R::pi() / convert(180.0)
}

#[inline]
fn radians_to_degrees_factor<R: RealField>() -> R {
    convert::<f64, R>(180.0) / R::pi()
}

/// Exterior orientation parameters (EOPs): the pose of one frame relative to
/// another, with variance-covariance matrices.
///
/// The translation is the origin of the source frame expressed in the target
/// frame. The rotation is given by the three Euler angles omega, phi and
/// kappa (rotations about the x, y and z axes). A point `p` in the source
/// frame maps to `R * p + t` in the target frame, with `R` from
/// [`rotation_matrix`](Self::rotation_matrix).
///
/// The angles are stored either in degrees or in radians and the
/// [`is_in_degrees`](Self::is_in_degrees) flag always describes the unit of
/// the stored values. Reading helpers such as
/// [`rotation_in_radians`](Self::rotation_in_radians) return a converted copy
/// and never change the stored unit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ExteriorOrientation<R: RealField> {
    translation: Point<R, 3>,
    rotation: Point<R, 3>,
    in_degrees: bool,
}

impl<R: RealField> Default for ExteriorOrientation<R> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<R: RealField> ExteriorOrientation<R> {
    /// Construct from a translation and three Euler angles.
    ///
    /// `in_degrees` gives the unit of `rotation`. Both covariance matrices are
    /// the identity.
    pub fn new(translation: Vector3<R>, rotation: Vector3<R>, in_degrees: bool) -> Self {
        Self {
            translation: Point::new(translation),
            rotation: Point::new(rotation),
            in_degrees,
        }
    }

    /// The identity transform (zero translation and rotation, in degrees).
    pub fn identity() -> Self {
        Self::new(Vector3::zeros(), Vector3::zeros(), true)
    }

    /// Construct from a translation and a rotation matrix.
    ///
    /// The Euler angles are extracted with
    /// [`euler_radians_from_rotation_matrix`](Self::euler_radians_from_rotation_matrix)
    /// and stored in the unit given by `in_degrees`.
    pub fn from_rotation_matrix(
        translation: Vector3<R>,
        rotation_matrix: &Matrix3<R>,
        in_degrees: bool,
    ) -> Self {
        let radians = Self::euler_radians_from_rotation_matrix(rotation_matrix);
        let rotation = if in_degrees {
            Self::rotation_to_degrees(&radians)
        } else {
            radians
        };
        Self::new(translation, rotation, in_degrees)
    }

    /// Construct from packed parameters `[tx, ty, tz, omega, phi, kappa]`
    /// with the angles in radians.
    ///
    /// Returns `Err(Error::InvalidInput)` unless exactly six values are given.
    pub fn from_parameters(parameters: &[R]) -> Result<Self> {
        if parameters.len() != 6 {
            return Err(Error::InvalidInput);
        }
        Ok(Self::new(
            Vector3::new(
                parameters[0].clone(),
                parameters[1].clone(),
                parameters[2].clone(),
            ),
            Vector3::new(
                parameters[3].clone(),
                parameters[4].clone(),
                parameters[5].clone(),
            ),
            false,
        ))
    }

    /// Packed parameters `[tx, ty, tz, omega, phi, kappa]` with the angles in
    /// radians.
    pub fn to_parameters(&self) -> [R; 6] {
        let t = self.translation.coords();
        let r = self.rotation_in_radians();
        [
            t[0].clone(),
            t[1].clone(),
            t[2].clone(),
            r[0].clone(),
            r[1].clone(),
            r[2].clone(),
        ]
    }

    /// Set the translation, resetting its covariance to the identity.
    pub fn set_translation(&mut self, tx: R, ty: R, tz: R) {
        self.set_translation_with_covariance(tx, ty, tz, Matrix3::identity());
    }

    /// Set the translation together with its covariance.
    pub fn set_translation_with_covariance(&mut self, tx: R, ty: R, tz: R, covariance: Matrix3<R>) {
        self.translation = Point::with_covariance(Vector3::new(tx, ty, tz), covariance);
    }

    /// Set the rotation, resetting its covariance to the identity.
    ///
    /// `in_degrees` gives the unit of the three angles.
    pub fn set_rotation(&mut self, omega: R, phi: R, kappa: R, in_degrees: bool) {
        self.set_rotation_with_covariance(omega, phi, kappa, in_degrees, Matrix3::identity());
    }

    /// Set the rotation together with its covariance.
    pub fn set_rotation_with_covariance(
        &mut self,
        omega: R,
        phi: R,
        kappa: R,
        in_degrees: bool,
        covariance: Matrix3<R>,
    ) {
        self.in_degrees = in_degrees;
        self.rotation = Point::with_covariance(Vector3::new(omega, phi, kappa), covariance);
    }

    /// The translation.
    #[inline]
    pub fn translation(&self) -> &Point<R, 3> {
        &self.translation
    }

    /// The translation (mutable reference).
    #[inline]
    pub fn translation_mut(&mut self) -> &mut Point<R, 3> {
        &mut self.translation
    }

    /// The rotation angles in their stored unit.
    #[inline]
    pub fn rotation(&self) -> &Point<R, 3> {
        &self.rotation
    }

    /// The rotation angles in their stored unit (mutable reference).
    ///
    /// The unit does not change by writing through this reference.
    #[inline]
    pub fn rotation_mut(&mut self) -> &mut Point<R, 3> {
        &mut self.rotation
    }

    /// `true` if the stored angles are in degrees, `false` for radians.
    #[inline]
    pub fn is_in_degrees(&self) -> bool {
        self.in_degrees
    }

    /// A copy of the rotation angles in degrees.
    pub fn rotation_in_degrees(&self) -> Vector3<R> {
        if self.in_degrees {
            self.rotation.coords().clone()
        } else {
            Self::rotation_to_degrees(self.rotation.coords())
        }
    }

    /// A copy of the rotation angles in radians.
    pub fn rotation_in_radians(&self) -> Vector3<R> {
        if self.in_degrees {
            Self::rotation_to_radians(self.rotation.coords())
        } else {
            self.rotation.coords().clone()
        }
    }

    /// Convert three angles from radians to degrees.
    pub fn rotation_to_degrees(rotation: &Vector3<R>) -> Vector3<R> {
        rotation * radians_to_degrees_factor::<R>()
    }

    /// Convert three angles from degrees to radians.
    pub fn rotation_to_radians(rotation: &Vector3<R>) -> Vector3<R> {
        rotation * degrees_to_radians_factor::<R>()
    }

    /// Convert the stored rotation to degrees.
    ///
    /// Returns `false` and does nothing if the rotation is already in
    /// degrees. The rotation covariance is rescaled with the angles.
    pub fn convert_rotation_to_degrees(&mut self) -> bool {
        if self.in_degrees {
            return false;
        }
        self.rescale_rotation(radians_to_degrees_factor());
        self.in_degrees = true;
        true
    }

    /// Convert the stored rotation to radians.
    ///
    /// Returns `false` and does nothing if the rotation is already in
    /// radians. The rotation covariance is rescaled with the angles.
    pub fn convert_rotation_to_radians(&mut self) -> bool {
        if !self.in_degrees {
            return false;
        }
        self.rescale_rotation(degrees_to_radians_factor());
        self.in_degrees = false;
        true
    }

    fn rescale_rotation(&mut self, factor: R) {
        *self.rotation.coords_mut() *= factor.clone();
        *self.rotation.covariance_mut() *= factor.clone() * factor;
    }

    /// Build the rotation matrix from three Euler angles in radians.
    ///
    /// The matrix rotates vectors of the source (camera) frame into the target
    /// (mapping) frame. Its transpose maps the target frame into the source
    /// frame.
    pub fn rotation_matrix_from_euler_radians(angles: &Vector3<R>) -> Matrix3<R> {
        let (sinw, cosw) = angles[0].clone().sin_cos();
        let (sinp, cosp) = angles[1].clone().sin_cos();
        let (sink, cosk) = angles[2].clone().sin_cos();

        Matrix3::new(
            // 1st row
            cosp.clone() * cosk.clone(),
            -cosp.clone() * sink.clone(),
            sinp.clone(),
            // 2nd row
            cosw.clone() * sink.clone() + sinw.clone() * sinp.clone() * cosk.clone(),
            cosw.clone() * cosk.clone() - sinw.clone() * sinp.clone() * sink.clone(),
            -sinw.clone() * cosp.clone(),
            // 3rd row
            sinw.clone() * sink.clone() - cosw.clone() * sinp.clone() * cosk.clone(),
            sinw.clone() * cosk + cosw.clone() * sinp * sink,
            cosw * cosp,
        )
    }

    /// Build the rotation matrix from three Euler angles in degrees.
    pub fn rotation_matrix_from_euler_degrees(angles: &Vector3<R>) -> Matrix3<R> {
        Self::rotation_matrix_from_euler_radians(&Self::rotation_to_radians(angles))
    }

    /// Extract the three Euler angles (in radians) from a rotation matrix.
    ///
    /// This inverts
    /// [`rotation_matrix_from_euler_radians`](Self::rotation_matrix_from_euler_radians).
    /// Phi is returned in `[-pi/2, pi/2]`. At `phi = +-pi/2` (gimbal lock)
    /// omega and kappa are not unique and the result is not meaningful.
    pub fn euler_radians_from_rotation_matrix(rotation_matrix: &Matrix3<R>) -> Vector3<R> {
        let one: R = one();
        let sinp = rotation_matrix[(0, 2)].clone().max(-one.clone()).min(one);
        let phi = sinp.asin();
        let cosp = phi.clone().cos();
        let omega = (-rotation_matrix[(1, 2)].clone() / cosp.clone())
            .atan2(rotation_matrix[(2, 2)].clone() / cosp.clone());
        let kappa = (-rotation_matrix[(0, 1)].clone() / cosp.clone())
            .atan2(rotation_matrix[(0, 0)].clone() / cosp);
        Vector3::new(omega, phi, kappa)
    }

    /// Extract the three Euler angles (in degrees) from a rotation matrix.
    pub fn euler_degrees_from_rotation_matrix(rotation_matrix: &Matrix3<R>) -> Vector3<R> {
        Self::rotation_to_degrees(&Self::euler_radians_from_rotation_matrix(rotation_matrix))
    }

    /// The rotation matrix of the stored angles.
    pub fn rotation_matrix(&self) -> Matrix3<R> {
        Self::rotation_matrix_from_euler_radians(&self.rotation_in_radians())
    }

    /// Map a point from the source frame into the target frame.
    pub fn transform_point(&self, point: &Vector3<R>) -> Vector3<R> {
        self.rotation_matrix() * point + self.translation.coords()
    }

    /// The inverse transform (target frame to source frame).
    ///
    /// The result keeps the rotation unit of `self` and carries identity
    /// covariances.
    pub fn inverse(&self) -> Self {
        let rotation_t = self.rotation_matrix().transpose();
        let translation = -(&rotation_t * self.translation.coords());
        Self::from_rotation_matrix(translation, &rotation_t, self.in_degrees)
    }

    /// Compose two transforms.
    ///
    /// If `self` maps frame `a` into frame `b` and `other` maps `b` into `c`,
    /// the result maps `a` into `c`:
    /// `R_ac = R_bc * R_ab` and `t_ac = t_bc + R_bc * t_ab`.
    ///
    /// This is how a non-reference camera is chained through the mounting of
    /// its reference camera and the body frame up to the mapping frame. The
    /// result keeps the rotation unit of `self` and carries identity
    /// covariances.
    pub fn transform_to(&self, other: &Self) -> Self {
        let r_ab = self.rotation_matrix();
        let r_bc = other.rotation_matrix();
        let translation = other.translation.coords() + &r_bc * self.translation.coords();
        Self::from_rotation_matrix(translation, &(r_bc * r_ab), self.in_degrees)
    }
}

impl<R: RealField> ExteriorOrientation<R> {
    /// `true` if both translation and rotation are zero.
    pub fn is_identity(&self) -> bool {
        let zero: R = zero();
        self.translation.iter().all(|v| *v == zero) && self.rotation.iter().all(|v| *v == zero)
    }
}
