#[cfg(feature = "std")]
mod block_tests {
    use nalgebra::{SVector, Vector2, Vector3};

    use photogrammetry_block::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn rgb_iops() -> InteriorOrientation<f64> {
        InteriorOrientation::new(
            6000,
            4000,
            0.004,
            0.004,
            Vector3::new(0.015, -0.02, 24.0),
            SVector::<f64, 9>::from_column_slice(&[
                0.0, 1.5e-4, -2e-7, 0.0, 2e-5, -1e-5, 0.0, 5e-5, 0.0,
            ]),
        )
    }

    fn nir_iops() -> InteriorOrientation<f64> {
        InteriorOrientation::new(
            2000,
            1500,
            0.008,
            0.008,
            Vector3::new(-0.01, 0.005, 16.0),
            SVector::<f64, 9>::from_column_slice(&[
                0.0, -8e-5, 1e-7, 0.0, -1e-5, 1e-5, 0.0, 0.0, 2e-5,
            ]),
        )
    }

    /// Synthesize the pixel `(col, row)` at which `object_point` appears in
    /// `image_id`.
    fn observe(
        block: &FrameImageBlock,
        image_id: &str,
        object_point: &Vector3<f64>,
    ) -> (f64, f64) {
        let image = block.image(image_id).unwrap();
        let image = image.borrow();
        let camera = block.camera(image.camera_id()).unwrap();
        let camera = camera.borrow();
        let iops = camera.iops();

        let camera_to_body = block.camera_to_body(image.camera_id()).unwrap();
        let body_to_mapping = block.body_pose(image_id).unwrap();
        let camera_to_mapping = camera_to_body.transform_to(&body_to_mapping);
        let p = camera_to_mapping.inverse().transform_point(object_point);
        assert!(p.z < 0.0, "point behind camera");

        let criteria = DistortionCriteria {
            tolerance: 1e-12,
            max_iterations: 100,
        };
        let distorted = iops
            .add_distortion_ext(-iops.c() * p.x / p.z, -iops.c() * p.y / p.z, criteria)
            .unwrap();
        let pixel = iops.convert_image_coordinates_to_pixel(distorted.x, distorted.y);
        (pixel[1], pixel[0])
    }

    fn rig_block() -> FrameImageBlock {
        let mut block: FrameImageBlock = FrameImageBlock::new();

        // the reference camera looks straight down from the body origin
        let rgb_to_body = ExteriorOrientation::new(
            Vector3::new(0.05, 0.0, -0.1),
            Vector3::new(0.2, -0.1, 90.0),
            true,
        );
        // the second camera is 12 cm to the side, slightly tilted
        let nir_to_rgb = ExteriorOrientation::new(
            Vector3::new(0.12, 0.0, 0.0),
            Vector3::new(0.0, 3.0, 0.5),
            true,
        );
        assert!(block.add_camera("rgb", shared(FrameCamera::new("rgb", rgb_to_body, rgb_iops()))));
        assert!(block.add_camera("nir", shared(FrameCamera::new("rgb", nir_to_rgb, nir_iops()))));

        for (t, x) in [(1000u64, 480.0), (2000, 520.0)] {
            let pose = ExteriorOrientation::new(
                Vector3::new(x, 300.0, 250.0),
                Vector3::new(1.0, -0.5, 178.0),
                true,
            );
            assert!(block.add_navigation(t, shared(pose)));
            for camera_id in ["rgb", "nir"] {
                let image = Image::new(camera_id, ExteriorOrientation::identity())
                    .with_file_path(format!("{}_{}.tif", camera_id, t))
                    .with_time_tag(t);
                assert!(block.add_image(format!("{}_{}", camera_id, t), shared(image)));
            }
        }
        block
    }

    #[test]
    fn registry_scenarios() {
        init_logging();
        let mut block: FrameImageBlock = FrameImageBlock::new();
        assert!(block.add_camera("camera1", shared(FrameCamera::default())));
        assert!(!block.add_camera("camera1", shared(FrameCamera::default())));
        assert_eq!(block.number_of_cameras(), 1);

        match block.camera("unknown") {
            Err(Error::NotFound { kind, id }) => {
                assert_eq!(kind, EntityKind::Camera);
                assert_eq!(id, "unknown");
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
        let err = block.image("img").unwrap_err();
        assert_eq!(err.to_string(), "cannot find image `img`");

        let mut image: FrameImage = Image::new("camera1", ExteriorOrientation::identity());
        assert!(image.add_point("p", ImagePoint::new(1.0, 2.0, "p")));
        assert!(image.delete_point("p"));
        assert!(!image.delete_point("p"));
    }

    #[test]
    fn shared_entries_are_mutated_in_place() {
        init_logging();
        let mut block: FrameImageBlock = FrameImageBlock::new();
        let handle = shared(ObjectPoint::new(1.0, 2.0, 3.0, "p"));
        block.add_object_point("p", handle.clone());
        handle.borrow_mut().point_mut()[2] = 10.0;
        assert_eq!(block.object_point("p").unwrap().borrow()[2], 10.0);
        // removing from the block leaves outside handles valid
        assert!(block.remove_object_point("p"));
        assert_eq!(handle.borrow().point_id(), "p");
    }

    #[test]
    fn rig_residuals() {
        init_logging();
        let mut block = rig_block();
        let tie = Vector3::new(500.0, 310.0, 12.0);

        let mut point = ObjectPoint::new(tie.x, tie.y, tie.z, "tie");
        for image_id in ["rgb_1000", "nir_1000", "rgb_2000", "nir_2000"] {
            let (col, row) = observe(&block, image_id, &tie);
            let image = block.image(image_id).unwrap();
            assert!(image
                .borrow_mut()
                .add_point("m1", ImagePoint::new(col, row, "m1")));
            assert!(point.add_observation(image_id, "m1"));
        }
        let point = shared(point);
        assert!(block.add_object_point("tie", point.clone()));

        let residuals = block.object_point_residuals("tie").unwrap();
        let ids: Vec<&str> = residuals.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["nir_1000", "nir_2000", "rgb_1000", "rgb_2000"]);
        for (image_id, residual) in residuals.iter() {
            assert!(residual.amax() < 1e-8, "{}: {}", image_id, residual);
        }

        // moving the point through its handle changes the residuals
        point.borrow_mut().point_mut()[0] += 0.5;
        let residuals = block.object_point_residuals("tie").unwrap();
        for (image_id, residual) in residuals.iter() {
            assert!(residual.amax() > 1e-4, "{}: {}", image_id, residual);
        }

        // a missing navigation sample is reported
        assert!(block.remove_navigation(2000));
        assert!(matches!(
            block.observation_residual("rgb_2000", "m1", "tie"),
            Err(Error::NotFound {
                kind: EntityKind::Navigation,
                ..
            })
        ));
    }

    #[test]
    fn cost_function_matches_block() {
        init_logging();
        let mut block = rig_block();
        let tie = Vector3::new(505.0, 295.0, 3.0);
        let (col, row) = observe(&block, "nir_2000", &tie);
        // measurement noise
        let (col, row) = (col + 0.3, row - 0.2);
        block
            .image("nir_2000")
            .unwrap()
            .borrow_mut()
            .add_point("m", ImagePoint::new(col, row, "m"));
        block.add_object_point("tie", shared(ObjectPoint::new(tie.x, tie.y, tie.z, "tie")));
        let expected = block.observation_residual("nir_2000", "m", "tie").unwrap();
        assert!(expected.amax() > 1e-4);

        let nir = block.camera("nir").unwrap();
        let nir = nir.borrow();
        let rgb = block.camera("rgb").unwrap();
        let rgb = rgb.borrow();
        let observed = nir.iops().convert_pixel_to_image_coordinates(row, col);
        let cost = CollinearityResidual::new(observed.x, observed.y);

        let mut residuals = [0.0; CollinearityResidual::NUM_RESIDUALS];
        assert!(cost.evaluate(
            &nir.iops().to_parameters(),
            tie.as_slice(),
            &block.body_pose("nir_2000").unwrap().to_parameters(),
            &rgb.mounting_parameters().to_parameters(),
            &nir.mounting_parameters().to_parameters(),
            &mut residuals,
        ));
        assert!((Vector2::new(residuals[0], residuals[1]) - expected).amax() < 1e-9);
    }
}

#[cfg(feature = "std")]
mod cam_geom_tests {
    use cam_geom::{intrinsic_test_utils::roundtrip_intrinsics, IntrinsicParameters, Points};
    use nalgebra::{RowVector3, SVector, Vector2, Vector3};

    use photogrammetry_block::*;

    fn distorted_iops() -> InteriorOrientation<f64> {
        InteriorOrientation::new(
            1000,
            800,
            1.0,
            1.0,
            Vector3::new(3.0, -2.0, 1000.0),
            SVector::<f64, 9>::from_column_slice(&[
                0.0, 1e-8, 1e-14, 0.0, 1e-6, -2e-6, 0.0, 0.0, 0.0,
            ]),
        )
    }

    #[test]
    fn roundtrip_f64() {
        let iops = distorted_iops();
        roundtrip_intrinsics(&iops, 1000, 800, 10, 20, 1e-3);
    }

    #[test]
    fn roundtrip_without_distortion_f32() {
        let iops: InteriorOrientation<f32> = InteriorOrientation::new(
            640,
            480,
            1.0,
            1.0,
            Vector3::new(0.0, 0.0, 500.0),
            SVector::zeros(),
        );
        roundtrip_intrinsics(&iops, 640, 480, 5, 10, 1e-2);
    }

    #[test]
    fn camera_frame_convention() {
        let iops = distorted_iops();
        // cam-geom looks along +z with y down
        let pt = Points::new(RowVector3::new(40.0, -25.0, 900.0));
        let pixel = iops.camera_to_pixel(&pt);

        // the same point in the photogrammetric camera frame looks along -z
        // with y up
        let identity = ExteriorOrientation::identity();
        let predicted_free = Vector2::new(1000.0 * 40.0 / 900.0, 1000.0 * 25.0 / 900.0);
        let observed = iops
            .add_distortion(predicted_free.x, predicted_free.y)
            .unwrap();
        let residual = collinearity_residual(
            &iops,
            &Vector3::new(40.0, 25.0, -900.0),
            &identity,
            &identity,
            &identity,
            &observed,
        )
        .unwrap();
        assert!(residual.amax() < 1e-5);

        let expected = iops.convert_image_coordinates_to_pixel(observed.x, observed.y);
        assert!((pixel.data[(0, 0)] - expected[1]).abs() < 1e-9);
        assert!((pixel.data[(0, 1)] - expected[0]).abs() < 1e-9);
        // above the image center
        assert!(pixel.data[(0, 1)] < 400.0);
    }

    #[test]
    fn non_invertible_distortion_gives_nan() {
        let iops: InteriorOrientation<f64, 1> = InteriorOrientation::new(
            100,
            100,
            1.0,
            1.0,
            Vector3::new(0.0, 0.0, 50.0),
            SVector::<f64, 1>::new(3.0),
        );
        let pixel = iops.camera_to_pixel(&Points::new(RowVector3::new(1.0, 1.0, 10.0)));
        assert!(pixel.data[(0, 0)].is_nan());
        assert!(pixel.data[(0, 1)].is_nan());
    }
}

#[cfg(feature = "serde-serialize")]
mod serde_tests {
    use nalgebra::{SVector, Vector3};

    use photogrammetry_block::*;

    #[test]
    fn camera_roundtrip() {
        let iops: InteriorOrientation<f64, 7> = InteriorOrientation::new(
            4000,
            3000,
            0.0045,
            0.0045,
            Vector3::new(0.01, 0.02, 35.5),
            SVector::<f64, 7>::from_column_slice(&[1e-4, -2e-7, 0.0, 1e-5, 0.0, 0.0, 0.0]),
        )
        .with_model(DistortionModel::Legacy7);
        let mounting = ExteriorOrientation::new(
            Vector3::new(0.1, 0.2, 0.3),
            Vector3::new(180.0, 0.0, -90.0),
            true,
        );
        let camera = FrameCamera::new("ref", mounting, iops);

        let buf = serde_yaml::to_string(&camera).unwrap();
        let back: FrameCamera<f64, 7> = serde_yaml::from_str(&buf).unwrap();
        assert_eq!(camera, back);
        assert_eq!(back.iops().model(), DistortionModel::Legacy7);
    }

    #[test]
    fn image_roundtrip() {
        let mut image: FrameImage =
            Image::new("ref", ExteriorOrientation::identity()).with_time_tag(17);
        image.add_point("a", ImagePoint::new(10.0, 20.0, "a"));
        let buf = serde_yaml::to_string(&image).unwrap();
        let back: FrameImage = serde_yaml::from_str(&buf).unwrap();
        assert_eq!(image, back);

        let mut point = ObjectPoint::new(1.0, 2.0, 3.0, "a");
        point.add_observation("img", "a");
        let buf = serde_yaml::to_string(&point).unwrap();
        let back: ObjectPoint = serde_yaml::from_str(&buf).unwrap();
        assert_eq!(point, back);
    }

    #[test]
    fn criteria_from_yaml() {
        let criteria: DistortionCriteria =
            serde_yaml::from_str("tolerance: 1.0e-9\nmax_iterations: 50\n").unwrap();
        assert_eq!(criteria.max_iterations, 50);
        assert_eq!(criteria.tolerance, 1e-9);
    }
}
