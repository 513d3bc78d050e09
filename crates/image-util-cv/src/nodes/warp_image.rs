//! Applies a fixed perspective transform to every image

use super::subscribe_operation;
use crate::bridge::CvImage;
use crate::traits::ImageOperation;
use crate::Result;
use anyhow::Context;
use image_util_core::params::WarpImageParams;
use image_util_core::{fatal, NodeHandle, OutputSize, Subscriber, TransformMatrix};
use opencv::{
    core::{Mat, Scalar, Size, BORDER_CONSTANT},
    imgproc::{self, INTER_LANCZOS4},
    prelude::*,
};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub struct PerspectiveWarp {
    matrix: TransformMatrix,
    output_size: OutputSize,
}

impl PerspectiveWarp {
    pub fn new(matrix: TransformMatrix, output_size: OutputSize) -> Self {
        Self {
            matrix,
            output_size,
        }
    }

    pub fn matrix(&self) -> &TransformMatrix {
        &self.matrix
    }

    pub fn output_size(&self) -> OutputSize {
        self.output_size
    }

    /// Warp with Lanczos interpolation; pixels mapped from outside the source are black
    pub fn warp(&self, src: &Mat) -> Result<Mat> {
        let (width, height) = self.output_size.resolve(src.cols(), src.rows());
        let m = Mat::from_slice_2d(&self.matrix.rows()[..]).context("Failed to build transform matrix")?;

        let mut warped = Mat::default();
        imgproc::warp_perspective(
            src,
            &mut warped,
            &m,
            Size::new(width, height),
            INTER_LANCZOS4,
            BORDER_CONSTANT,
            Scalar::default(),
        )
        .context("Perspective warp failed")?;

        Ok(warped)
    }
}

impl ImageOperation for PerspectiveWarp {
    fn apply(&self, image: CvImage) -> Result<CvImage> {
        let warped = self.warp(&image.image)?;
        Ok(CvImage {
            header: image.header,
            encoding: image.encoding,
            image: warped,
        })
    }
}

/// Subscribes to `image`, publishes on `warped_image`.
///
/// Invalid configuration leaves the node inert (no topics at all) instead of
/// shutting down, since other components may share the process.
pub struct WarpImageNode {
    name: String,
    warp: Option<PerspectiveWarp>,
    subscriber: Option<Subscriber>,
}

impl WarpImageNode {
    pub fn new(node: NodeHandle) -> Result<Self> {
        let params: WarpImageParams = node.parameters()?;
        let name = node.name().to_string();

        let configured = params.output_size().and_then(|size| Ok((size, params.transform()?)));
        let (output_size, matrix) = match configured {
            Ok(configured) => configured,
            Err(e) => {
                fatal!(node = %name, "{}", e);
                return Ok(Self {
                    name,
                    warp: None,
                    subscriber: None,
                });
            }
        };

        if output_size == OutputSize::InheritFromInput {
            tracing::info!(
                node = %name,
                "No width and height parameters given. Output images will be same size as input."
            );
        }
        tracing::info!(node = %name, "Transformation matrix: {}", matrix);

        let warp = PerspectiveWarp::new(matrix, output_size);
        let publisher = node.advertise("warped_image", false);
        let subscriber = subscribe_operation(&node, "image", publisher, Arc::new(warp));

        Ok(Self {
            name,
            warp: Some(warp),
            subscriber: Some(subscriber),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// False when configuration was rejected and nothing is subscribed
    pub fn is_active(&self) -> bool {
        self.subscriber.is_some()
    }

    pub fn warp(&self) -> Option<&PerspectiveWarp> {
        self.warp.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::test_support::{collect, gradient_bgr};
    use image_util_core::{encodings, Context, Header, ImageTransport, NodeOptions, Time};
    use serde_json::json;

    const IDENTITY: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

    fn load(parameters: serde_json::Value) -> Result<(WarpImageNode, ImageTransport)> {
        let transport = ImageTransport::new();
        let options = NodeOptions::new().with_parameters(parameters);
        let node = WarpImageNode::new(NodeHandle::new("warp_image", &Context::new(), &transport, options))?;
        Ok((node, transport))
    }

    #[test]
    fn test_identity_warp_preserves_pixels() -> Result<()> {
        let (node, transport) = load(json!({ "transform": IDENTITY }))?;
        assert!(node.is_active());

        let (_sink, received) = collect(&transport, "warped_image");
        let mut input = gradient_bgr(32, 24);
        input.header = Header {
            stamp: Time::new(100, 200),
            frame_id: "front".to_string(),
        };
        transport.advertise("image", false).publish(input.clone());

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].width, 32);
        assert_eq!(received[0].height, 24);
        assert_eq!(received[0].encoding, encodings::BGR8);
        assert_eq!(received[0].header, input.header);
        assert_eq!(received[0].data, input.data);
        Ok(())
    }

    #[test]
    fn test_explicit_output_size() -> Result<()> {
        let (node, transport) = load(json!({ "width": 10, "height": 6, "transform": IDENTITY }))?;
        assert_eq!(
            node.warp().map(PerspectiveWarp::output_size),
            Some(OutputSize::Explicit { width: 10, height: 6 })
        );

        let (_sink, received) = collect(&transport, "warped_image");
        let input = gradient_bgr(32, 24);
        transport.advertise("image", false).publish(input.clone());

        let received = received.lock().unwrap();
        assert_eq!((received[0].width, received[0].height), (10, 6));
        // Top-left corner is an identity crop of the input
        assert_eq!(&received[0].data[..30], &input.data[..30]);
        Ok(())
    }

    #[test]
    fn test_translation_shifts_content() -> Result<()> {
        let warp = PerspectiveWarp::new(
            TransformMatrix::from_row_major(&[1.0, 0.0, 2.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])?,
            OutputSize::InheritFromInput,
        );
        let src = CvImage::from_msg(&gradient_bgr(16, 4))?.image;
        let warped = warp.warp(&src)?;

        assert_eq!(
            *warped.at_2d::<opencv::core::Vec3b>(1, 5)?,
            *src.at_2d::<opencv::core::Vec3b>(1, 3)?
        );
        assert_eq!(*warped.at_2d::<opencv::core::Vec3b>(1, 0)?, opencv::core::Vec3b::from([0, 0, 0]));
        Ok(())
    }

    #[test]
    fn test_bad_transform_leaves_node_inert() -> Result<()> {
        let (node, transport) = load(json!({ "transform": [1.0, 0.0, 0.0] }))?;
        assert!(!node.is_active());
        assert_eq!(transport.subscriber_count("image"), 0);
        assert_eq!(transport.publisher_count("warped_image"), 0);

        let (_sink, received) = collect(&transport, "warped_image");
        transport.advertise("image", false).publish(gradient_bgr(4, 4));
        assert!(received.lock().unwrap().is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_transform_leaves_node_inert() -> Result<()> {
        let (node, _transport) = load(json!({}))?;
        assert!(!node.is_active());
        Ok(())
    }
}
