#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

use nalgebra::{
    allocator::Allocator,
    base::storage::{Owned, Storage},
    convert, one, zero, DefaultAllocator, Dim, OMatrix, RealField, SVector, Vector2, Vector3, U1,
    U2, U3,
};

use cam_geom::{
    coordinate_system::CameraFrame, ray_bundle_types::SharedOriginRayBundle, Bundle,
    IntrinsicParameters, Pixels, Points, RayBundle,
};

use crate::{Error, Point, Result};

/// The layout of the distortion parameter vector.
///
/// Every model feeds the same formula (see
/// [`DistortionCoefficients::evaluate`]). The models only differ in which
/// slot of the parameter vector holds which coefficient. Coefficients whose
/// slot lies beyond the end of the parameter vector are zero, so a short
/// vector selects a reduced model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum DistortionModel {
    /// `[k0, k1, k2, k3, p1, p2, p3, a1, a2]`: four radial, three
    /// decentering and two affine parameters.
    #[default]
    Extended,
    /// `[k1, k2, k3, p1, p2, a1, a2]`: three radial, two decentering and two
    /// affine parameters (`k0 = p3 = 0`).
    Legacy7,
}

impl DistortionModel {
    /// The number of parameters a full vector of this model has.
    pub fn number_of_parameters(&self) -> usize {
        match self {
            DistortionModel::Extended => 9,
            DistortionModel::Legacy7 => 7,
        }
    }
}

/// Named distortion coefficients, unpacked from a parameter vector.
#[derive(Debug, Clone, PartialEq)]
pub struct DistortionCoefficients<R: RealField> {
    /// Radial distortion, constant term (a scale change of the principal distance).
    pub k0: R,
    /// Radial distortion, `r^2` term.
    pub k1: R,
    /// Radial distortion, `r^4` term.
    pub k2: R,
    /// Radial distortion, `r^6` term.
    pub k3: R,
    /// First decentering term.
    pub p1: R,
    /// Second decentering term.
    pub p2: R,
    /// Radial scaling of the decentering terms.
    pub p3: R,
    /// Affine scale difference.
    pub a1: R,
    /// Affine shear.
    pub a2: R,
}

impl<R: RealField> DistortionCoefficients<R> {
    /// All coefficients zero.
    pub fn zero() -> Self {
        Self {
            k0: zero(),
            k1: zero(),
            k2: zero(),
            k3: zero(),
            p1: zero(),
            p2: zero(),
            p3: zero(),
            a1: zero(),
            a2: zero(),
        }
    }

    /// Unpack a parameter vector laid out according to `model`.
    ///
    /// Slots missing from `parameters` read as zero. Extra values are
    /// ignored.
    pub fn from_slice(model: DistortionModel, parameters: &[R]) -> Self {
        let get = |i: usize| parameters.get(i).cloned().unwrap_or_else(zero);
        match model {
            DistortionModel::Extended => Self {
                k0: get(0),
                k1: get(1),
                k2: get(2),
                k3: get(3),
                p1: get(4),
                p2: get(5),
                p3: get(6),
                a1: get(7),
                a2: get(8),
            },
            DistortionModel::Legacy7 => Self {
                k0: zero(),
                k1: get(0),
                k2: get(1),
                k3: get(2),
                p1: get(3),
                p2: get(4),
                p3: zero(),
                a1: get(5),
                a2: get(6),
            },
        }
    }

    /// The distortion at an image point given relative to the principal point.
    ///
    /// With `r^2 = dx^2 + dy^2` the result is the sum of
    ///
    /// - radial: `(k0 + k1 r^2 + k2 r^4 + k3 r^6) * (dx, dy)`
    /// - decentering: `(1 + p3 r^2) * (p1 (r^2 + 2 dx^2) + 2 p2 dx dy, 2 p1 dx dy + p2 (r^2 + 2 dy^2))`
    /// - affine: `(-a1 dx + a2 dy, a1 dy)`
    pub fn evaluate(&self, dx: R, dy: R) -> Vector2<R> {
        let two: R = convert(2.0);
        let dxy = dx.clone() * dy.clone();
        let dx2 = dx.clone() * dx.clone();
        let dy2 = dy.clone() * dy.clone();
        let r2 = dx2.clone() + dy2.clone();
        let r4 = r2.clone() * r2.clone();
        let r6 = r4.clone() * r2.clone();

        let radial = self.k0.clone()
            + self.k1.clone() * r2.clone()
            + self.k2.clone() * r4
            + self.k3.clone() * r6;
        let radial_x = dx.clone() * radial.clone();
        let radial_y = dy.clone() * radial;

        let decentering = one::<R>() + self.p3.clone() * r2.clone();
        let decentering_x = decentering.clone()
            * (self.p1.clone() * (r2.clone() + two.clone() * dx2)
                + two.clone() * self.p2.clone() * dxy.clone());
        let decentering_y = decentering
            * (two.clone() * self.p1.clone() * dxy + self.p2.clone() * (r2 + two * dy2));

        let affine_x = -self.a1.clone() * dx + self.a2.clone() * dy.clone();
        let affine_y = self.a1.clone() * dy;

        Vector2::new(
            radial_x + decentering_x + affine_x,
            radial_y + decentering_y + affine_y,
        )
    }
}

/// Termination criteria for [`InteriorOrientation::add_distortion_ext`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct DistortionCriteria {
    /// Stop once the un-distorted estimate is closer than this to the target,
    /// in image coordinate units.
    pub tolerance: f64,
    /// Fail after this many iterations.
    pub max_iterations: usize,
}

impl Default for DistortionCriteria {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

/// Interior orientation parameters (IOPs) of a frame camera.
///
/// The image coordinate system has its origin at the image center, with x
/// pointing right and y pointing up. Pixel coordinates have their origin at
/// the upper left corner, with rows growing downwards.
///
/// `N` is the length of the distortion parameter vector, interpreted
/// according to `model`. The default is the nine parameter
/// [`DistortionModel::Extended`] layout.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct InteriorOrientation<R: RealField, const N: usize = 9> {
    /// The width of the image (in pixels).
    pub width: u32,
    /// The height of the image (in pixels).
    pub height: u32,
    /// The pixel size along x.
    pub x_pixel_size: R,
    /// The pixel size along y.
    pub y_pixel_size: R,
    /// The principal offset and principal distance `(xp, yp, c)`.
    pub xyc: Point<R, 3>,
    /// The distortion parameters.
    pub distortion_parameters: Point<R, N>,
    /// The layout of `distortion_parameters`.
    pub model: DistortionModel,
}

impl<R: RealField, const N: usize> Default for InteriorOrientation<R, N> {
    fn default() -> Self {
        Self::new(0, 0, one(), one(), Vector3::zeros(), SVector::zeros())
    }
}

impl<R: RealField, const N: usize> InteriorOrientation<R, N> {
    /// Construct interior orientation parameters with identity covariances
    /// and the [`DistortionModel::Extended`] layout.
    pub fn new(
        width: u32,
        height: u32,
        x_pixel_size: R,
        y_pixel_size: R,
        xyc: Vector3<R>,
        distortion_parameters: SVector<R, N>,
    ) -> Self {
        Self {
            width,
            height,
            x_pixel_size,
            y_pixel_size,
            xyc: Point::new(xyc),
            distortion_parameters: Point::new(distortion_parameters),
            model: DistortionModel::default(),
        }
    }

    /// Use `model` to interpret the distortion parameters.
    pub fn with_model(mut self, model: DistortionModel) -> Self {
        self.model = model;
        self
    }

    /// The principal offset along x.
    #[inline]
    pub fn xp(&self) -> R {
        self.xyc[0].clone()
    }

    /// The principal offset along y.
    #[inline]
    pub fn yp(&self) -> R {
        self.xyc[1].clone()
    }

    /// The principal distance.
    #[inline]
    pub fn c(&self) -> R {
        self.xyc[2].clone()
    }

    /// The layout of the distortion parameters.
    #[inline]
    pub fn model(&self) -> DistortionModel {
        self.model
    }

    /// The distortion coefficients, unpacked according to the model.
    pub fn coefficients(&self) -> DistortionCoefficients<R> {
        DistortionCoefficients::from_slice(self.model, self.distortion_parameters.as_slice())
    }

    /// Calculate the distortion at the image point `(x, y)`.
    ///
    /// `(x, y)` are image coordinates including the principal offset. The
    /// distortion-free coordinates, relative to the principal point, are
    /// `(x - xp - dx, y - yp - dy)` (see
    /// [`remove_distortion`](Self::remove_distortion)).
    pub fn calculate_distortion(&self, x: R, y: R) -> Vector2<R> {
        self.coefficients().evaluate(x - self.xp(), y - self.yp())
    }

    /// Remove distortion and principal offset from the image point `(x, y)`.
    pub fn remove_distortion(&self, x: R, y: R) -> Vector2<R> {
        let distortion = self.calculate_distortion(x.clone(), y.clone());
        Vector2::new(
            x - self.xp() - distortion[0].clone(),
            y - self.yp() - distortion[1].clone(),
        )
    }

    /// Add distortion and principal offset to distortion-free coordinates.
    ///
    /// This calls [add_distortion_ext](Self::add_distortion_ext) using the
    /// default termination criteria.
    pub fn add_distortion(&self, x: R, y: R) -> Result<Vector2<R>> {
        self.add_distortion_ext(x, y, None)
    }

    /// Add distortion and principal offset to distortion-free coordinates.
    ///
    /// `(x, y)` are relative to the principal point and free of distortion.
    /// The result are image coordinates `(x', y')` for which
    /// [`remove_distortion`](Self::remove_distortion) gives back `(x, y)`.
    /// They are found by fixed-point iteration.
    ///
    /// Returns `Err(Error::DistortionNotConverged)` if the tolerance is not
    /// reached within the iteration budget.
    pub fn add_distortion_ext(
        &self,
        x: R,
        y: R,
        criteria: impl Into<Option<DistortionCriteria>>,
    ) -> Result<Vector2<R>> {
        let criteria = criteria.into().unwrap_or_default();
        let tolerance: R = convert(criteria.tolerance);
        let xp = self.xp();
        let yp = self.yp();
        let coefficients = self.coefficients();

        let mut x_updated = x.clone();
        let mut y_updated = y.clone();
        for iteration in 1..=criteria.max_iterations {
            // distortion is evaluated relative to the principal point
            let distortion = coefficients.evaluate(x_updated.clone(), y_updated.clone());
            let dx = x.clone() - (x_updated.clone() - distortion[0].clone());
            let dy = y.clone() - (y_updated.clone() - distortion[1].clone());
            if (dx.clone() * dx + dy.clone() * dy).sqrt() < tolerance {
                log::debug!("distortion added after {} iterations", iteration);
                return Ok(Vector2::new(x_updated + xp, y_updated + yp));
            }
            x_updated = x.clone() + distortion[0].clone();
            y_updated = y.clone() + distortion[1].clone();
        }
        log::warn!(
            "adding distortion did not converge within {} iterations",
            criteria.max_iterations
        );
        Err(Error::DistortionNotConverged {
            max_iterations: criteria.max_iterations,
        })
    }

    /// Convert a pixel location to image coordinates.
    ///
    /// `x = (col - width / 2) * x_pixel_size` and
    /// `y = (height / 2 - row) * y_pixel_size`.
    pub fn convert_pixel_to_image_coordinates(&self, row: R, col: R) -> Vector2<R> {
        let (half_width, half_height) = self.half_size();
        let x = (col - half_width) * self.x_pixel_size.clone();
        let y = (half_height - row) * self.y_pixel_size.clone();
        Vector2::new(x, y)
    }

    /// Convert image coordinates to a pixel location, returned as `(row, col)`.
    pub fn convert_image_coordinates_to_pixel(&self, x: R, y: R) -> Vector2<R> {
        let (half_width, half_height) = self.half_size();
        let row = half_height - y / self.y_pixel_size.clone();
        let col = x / self.x_pixel_size.clone() + half_width;
        Vector2::new(row, col)
    }

    fn half_size(&self) -> (R, R) {
        (
            convert(f64::from(self.width) * 0.5),
            convert(f64::from(self.height) * 0.5),
        )
    }

    /// Overwrite `xp`, `yp`, `c` and the distortion parameters from a packed
    /// slice `[xp, yp, c, d0, .., d(N-1)]`.
    ///
    /// Returns `Err(Error::InvalidInput)` unless the slice has `3 + N` values.
    /// Covariances are left untouched.
    pub fn set_parameters(&mut self, parameters: &[R]) -> Result<()> {
        if parameters.len() != 3 + N {
            return Err(Error::InvalidInput);
        }
        self.xyc.coords_mut().copy_from_slice(&parameters[..3]);
        self.distortion_parameters
            .coords_mut()
            .copy_from_slice(&parameters[3..]);
        Ok(())
    }

    /// Packed parameters `[xp, yp, c, d0, .., d(N-1)]`, the layout expected by
    /// [`CollinearityResidual::evaluate`](crate::CollinearityResidual::evaluate).
    #[cfg(feature = "std")]
    pub fn to_parameters(&self) -> Vec<R> {
        self.xyc
            .iter()
            .chain(self.distortion_parameters.iter())
            .cloned()
            .collect()
    }
}

/// The `cam-geom` camera frame has x right, y down and z pointing forward.
/// The photogrammetric camera frame has x right, y up and looks along -z.
/// Pixels are `(col, row)`.
impl<R: RealField, const N: usize> IntrinsicParameters<R> for InteriorOrientation<R, N> {
    type BundleType = SharedOriginRayBundle<R>;

    fn pixel_to_camera<IN, NPTS>(
        &self,
        pixels: &Pixels<R, NPTS, IN>,
    ) -> RayBundle<CameraFrame, Self::BundleType, R, NPTS, Owned<R, NPTS, U3>>
    where
        Self::BundleType: Bundle<R>,
        IN: Storage<R, NPTS, U2>,
        NPTS: Dim,
        DefaultAllocator: Allocator<NPTS, U2>,
        DefaultAllocator: Allocator<NPTS, U3>,
        DefaultAllocator: Allocator<U1, U2>,
    {
        let mut result = RayBundle::new_shared_zero_origin(OMatrix::zeros_generic(
            NPTS::from_usize(pixels.data.nrows()),
            U3::from_usize(3),
        ));

        let c = self.c();
        for i in 0..pixels.data.nrows() {
            let col = pixels.data[(i, 0)].clone();
            let row = pixels.data[(i, 1)].clone();
            let image = self.convert_pixel_to_image_coordinates(row, col);
            let free = self.remove_distortion(image[0].clone(), image[1].clone());

            result.data[(i, 0)] = free[0].clone();
            result.data[(i, 1)] = -free[1].clone();
            result.data[(i, 2)] = c.clone();
        }
        result
    }

    fn camera_to_pixel<IN, NPTS>(
        &self,
        camera: &Points<CameraFrame, R, NPTS, IN>,
    ) -> Pixels<R, NPTS, Owned<R, NPTS, U2>>
    where
        IN: Storage<R, NPTS, U3>,
        NPTS: Dim,
        DefaultAllocator: Allocator<NPTS, U2>,
    {
        let mut result = Pixels::new(OMatrix::zeros_generic(
            NPTS::from_usize(camera.data.nrows()),
            U2::from_usize(2),
        ));

        let c = self.c();
        for i in 0..camera.data.nrows() {
            let x = camera.data[(i, 0)].clone();
            let y = camera.data[(i, 1)].clone();
            let z = camera.data[(i, 2)].clone();

            let x_free = c.clone() * x / z.clone();
            let y_free = -(c.clone() * y / z);
            match self.add_distortion(x_free, y_free) {
                Ok(image) => {
                    let pixel =
                        self.convert_image_coordinates_to_pixel(image[0].clone(), image[1].clone());
                    result.data[(i, 0)] = pixel[1].clone();
                    result.data[(i, 1)] = pixel[0].clone();
                }
                Err(_) => {
                    // no pixel corresponds to this point
                    let nan: R = convert(f64::NAN);
                    result.data[(i, 0)] = nan.clone();
                    result.data[(i, 1)] = nan;
                }
            }
        }
        result
    }
}
