//! Camera, image and object-point geometry for photogrammetric triangulation
//!
//! # About
//!
//! This crate models the geometry of airborne and terrestrial imaging
//! platforms as it is needed by a bundle adjustment: cameras, images, 3D
//! object points and the transformations linking the camera, body and mapping
//! reference frames. It does not solve the adjustment itself. Instead it
//! provides the collinearity residual and all of its inputs, ready to be
//! handed to an external non-linear least-squares solver.
//!
//! In greater detail:
//!
//! - [`ExteriorOrientation`] stores a translation and three Euler angles
//!   (omega, phi, kappa) between two frames, converts between degrees and
//!   radians, builds rotation matrices and composes frame transforms with
//!   [`ExteriorOrientation::transform_to`].
//! - [`InteriorOrientation`] is the lens and sensor model of a frame camera:
//!   principal point and distance, radial, decentering and affine distortion,
//!   the iterative inverse of the distortion and pixel to image coordinate
//!   conversions. It implements [the `IntrinsicParameters` trait from the
//!   `cam-geom`
//!   crate](https://docs.rs/cam-geom/latest/cam_geom/trait.IntrinsicParameters.html),
//!   so a
//!   [`cam_geom::Camera`](https://docs.rs/cam-geom/latest/cam_geom/struct.Camera.html)
//!   can be built from it.
//! - [`FrameCamera`], [`Image`], [`PointCloud`] and [`ImageBlock`] form the
//!   registry of everything an adjustment needs, keyed by string ids (and by
//!   timestamp for GNSS/INS navigation samples).
//! - [`CollinearityResidual`] and [`collinearity_residual`] predict an image
//!   coordinate from an object point and a chain of orientations.
//!
//! All math is generic over [`nalgebra::RealField`], so the same code runs on
//! `f32`, `f64` or on the dual numbers of an automatic differentiation
//! framework.
//!
//! # Example - build an image block and evaluate a residual
//!
//! ```
//! use nalgebra::{SVector, Vector3};
//! use photogrammetry_block::{
//!     shared, ExteriorOrientation, FrameCamera, FrameImageBlock, Image, ImagePoint,
//!     InteriorOrientation, ObjectPoint,
//! };
//!
//! // A 4000 x 3000 pixel camera with a principal distance of 3500 pixels and
//! // no distortion.
//! let iops: InteriorOrientation<f64> = InteriorOrientation::new(
//!     4000,
//!     3000,
//!     1.0,
//!     1.0,
//!     Vector3::new(0.0, 0.0, 3500.0),
//!     SVector::zeros(),
//! );
//! // A single camera is its own reference camera.
//! let camera = FrameCamera::new("nadir", ExteriorOrientation::identity(), iops);
//!
//! let mut block: FrameImageBlock = FrameImageBlock::new();
//! assert!(block.add_camera("nadir", shared(camera)));
//!
//! // The platform hovers 1000 units above the origin, looking straight down.
//! let mut pose = ExteriorOrientation::identity();
//! pose.set_translation(0.0, 0.0, 1000.0);
//! let mut image = Image::new("nadir", pose);
//! image.add_point("p1", ImagePoint::new(2035.0, 1430.0, "p1"));
//! assert!(block.add_image("img1", shared(image)));
//!
//! let mut point = ObjectPoint::new(10.0, 20.0, 0.0, "p1");
//! point.add_observation("img1", "p1");
//! assert!(block.add_object_point("p1", shared(point)));
//!
//! let residual = block.observation_residual("img1", "p1", "p1").unwrap();
//! assert!(residual.norm() < 1e-9);
//! ```
//!
//! # testing
//!
//! Test `no_std` compilation with:
//!
//! ```text
//! # install target with: "rustup target add thumbv7em-none-eabihf"
//! cargo check --no-default-features --target thumbv7em-none-eabihf
//! ```
//!
//! Without `std` only the orientation math and the collinearity model are
//! available. The registries need `std`.
//!
//! Run unit tests with:
//!
//! ```text
//! cargo test
//! cargo test --features serde-serialize
//! ```

#![deny(rust_2018_idioms, unsafe_code, missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate core as std;

mod collinearity;
mod exterior_orientation;
mod interior_orientation;
mod point;

#[cfg(feature = "std")]
mod camera;
#[cfg(feature = "std")]
mod image;
#[cfg(feature = "std")]
mod image_block;
#[cfg(feature = "std")]
mod point_cloud;

pub use collinearity::{
    camera_to_mapping, collinearity_residual, project_object_point, CollinearityResidual,
};
pub use exterior_orientation::ExteriorOrientation;
pub use interior_orientation::{
    DistortionCoefficients, DistortionCriteria, DistortionModel, InteriorOrientation,
};
pub use point::Point;

#[cfg(feature = "std")]
pub use camera::FrameCamera;
#[cfg(feature = "std")]
pub use image::{FrameImage, Image};
#[cfg(feature = "std")]
pub use image_block::{shared, FrameImageBlock, ImageBlock, Shared};
#[cfg(feature = "std")]
pub use point::{ImagePoint, ObjectPoint};
#[cfg(feature = "std")]
pub use point_cloud::PointCloud;

/// The kind of entity a failed lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EntityKind {
    /// a camera in an image block
    Camera,
    /// an image in an image block
    Image,
    /// an object point in an image block
    ObjectPoint,
    /// a navigation (GNSS/INS) sample in an image block
    Navigation,
    /// an entry of a point cloud
    Point,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Camera => "camera",
            EntityKind::Image => "image",
            EntityKind::ObjectPoint => "object point",
            EntityKind::Navigation => "navigation sample",
            EntityKind::Point => "point",
        };
        f.write_str(name)
    }
}

/// Possible errors.
#[derive(Debug)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
#[non_exhaustive]
pub enum Error {
    #[cfg_attr(feature = "std", error("invalid input"))]
    /// invalid input
    InvalidInput,
    #[cfg_attr(
        feature = "std",
        error("adding distortion did not converge within {max_iterations} iterations")
    )]
    /// the iterative distortion inverse did not reach its tolerance
    DistortionNotConverged {
        /// The iteration budget that was exhausted.
        max_iterations: usize,
    },
    #[cfg(feature = "std")]
    #[error("cannot find {kind} `{id}`")]
    /// lookup of an unknown id
    NotFound {
        /// What was looked up.
        kind: EntityKind,
        /// The id that is missing.
        id: String,
    },
}

#[cfg(feature = "std")]
impl Error {
    pub(crate) fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        let id = id.to_string();
        log::debug!("cannot find {} `{}`", kind, id);
        Error::NotFound { kind, id }
    }
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
