//! Draws a fixed polygon onto every image passing through

use super::subscribe_operation;
use crate::bridge::CvImage;
use crate::traits::ImageOperation;
use crate::Result;
use image_util_core::params::DrawPolygonParams;
use image_util_core::{fatal, Color, NodeHandle, Polygon, Subscriber};
use opencv::{
    core::{Mat, Point, Scalar, Vector},
    imgproc::{self, LINE_8},
};
use std::sync::Arc;

/// Polygon, color and line style applied to each image
#[derive(Debug, Clone)]
pub struct PolygonDrawing {
    polygon: Option<Polygon>,
    color: Color,
    thickness: i32,
}

impl PolygonDrawing {
    /// A `None` polygon draws nothing
    pub fn new(polygon: Option<Polygon>, color: Color, thickness: i32) -> Self {
        Self {
            polygon,
            color,
            thickness,
        }
    }

    pub fn polygon(&self) -> Option<&Polygon> {
        self.polygon.as_ref()
    }

    pub fn is_filled(&self) -> bool {
        self.thickness < 1
    }

    /// OpenCV color scalar (BGR order)
    pub fn bgr_scalar(&self) -> Scalar {
        let (b, g, r) = self.color.bgr();
        Scalar::new(b as f64, g as f64, r as f64, 0.0)
    }

    /// Fill the polygon when thickness < 1, otherwise outline it as a closed loop
    pub fn draw(&self, image: &mut Mat) -> Result<()> {
        let Some(polygon) = &self.polygon else {
            return Ok(());
        };

        let points: Vector<Point> = polygon
            .points()
            .iter()
            .map(|&(x, y)| Point::new(x, y))
            .collect();
        let mut contours = Vector::<Vector<Point>>::new();
        contours.push(points);

        if self.is_filled() {
            imgproc::fill_poly(image, &contours, self.bgr_scalar(), LINE_8, 0, Point::new(0, 0))?;
        } else {
            imgproc::polylines(image, &contours, true, self.bgr_scalar(), self.thickness, LINE_8, 0)?;
        }

        Ok(())
    }
}

impl ImageOperation for PolygonDrawing {
    fn apply(&self, mut image: CvImage) -> Result<CvImage> {
        self.draw(&mut image.image)?;
        Ok(image)
    }
}

/// Subscribes to `image_in`, publishes the drawn image on `image_out`
pub struct DrawPolygonNode {
    name: String,
    drawing: Arc<PolygonDrawing>,
    _subscriber: Subscriber,
}

impl DrawPolygonNode {
    /// A malformed polygon is logged as fatal; the node still runs and
    /// republishes images unchanged.
    pub fn new(node: NodeHandle) -> Result<Self> {
        let params: DrawPolygonParams = node.parameters()?;

        let polygon = match params.polygon() {
            Ok(polygon) => Some(polygon),
            Err(e) => {
                fatal!(node = %node.name(), "{}", e);
                None
            }
        };

        let drawing = Arc::new(PolygonDrawing::new(polygon, params.color(), params.thickness));

        let publisher = node.advertise("image_out", false);
        let subscriber = subscribe_operation(&node, "image_in", publisher, drawing.clone());

        tracing::info!(
            node = %node.name(),
            points = drawing.polygon().map_or(0, Polygon::len),
            filled = drawing.is_filled(),
            "Drawing polygon"
        );

        Ok(Self {
            name: node.name().to_string(),
            drawing,
            _subscriber: subscriber,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn drawing(&self) -> &PolygonDrawing {
        &self.drawing
    }
}
