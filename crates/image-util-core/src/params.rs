//! Node parameters and the validated values built from them

use crate::error::ParamError;
use crate::messages::encodings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Lowest publish rate accepted by the static image publisher (Hz)
pub const MIN_PUBLISH_RATE: f64 = 0.1;

/// Polygon drawer parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawPolygonParams {
    /// Below 1 the polygon is filled, otherwise outlined with this width
    pub thickness: i32,
    /// Color channels; values outside 0..=255 saturate
    pub r: i64,
    pub g: i64,
    pub b: i64,
    pub polygon: PolygonParams,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolygonParams {
    pub x: Option<Vec<i64>>,
    pub y: Option<Vec<i64>>,
}

impl Default for DrawPolygonParams {
    fn default() -> Self {
        Self {
            thickness: -1,
            r: 0,
            g: 0,
            b: 0,
            polygon: PolygonParams::default(),
        }
    }
}

impl DrawPolygonParams {
    pub fn color(&self) -> Color {
        Color::new(saturate_channel(self.r), saturate_channel(self.g), saturate_channel(self.b))
    }

    pub fn polygon(&self) -> Result<Polygon, ParamError> {
        Polygon::from_xy(self.polygon.x.as_deref(), self.polygon.y.as_deref())
    }
}

fn saturate_channel(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

/// Static image publisher parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagePubParams {
    pub image_file: PathBuf,
    /// `bgr8` loads the file in color; any other value loads it as `mono8`
    pub mode: String,
    /// Publish rate in Hz
    pub rate: f64,
}

impl Default for ImagePubParams {
    fn default() -> Self {
        Self {
            image_file: PathBuf::new(),
            mode: encodings::BGR8.to_string(),
            rate: 1.0,
        }
    }
}

impl ImagePubParams {
    pub fn rate_hz(&self) -> f64 {
        self.rate.max(MIN_PUBLISH_RATE)
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_hz())
    }

    pub fn loads_color(&self) -> bool {
        self.mode == encodings::BGR8
    }

    /// Encoding the loaded image is tagged with
    pub fn encoding(&self) -> &'static str {
        if self.loads_color() {
            encodings::BGR8
        } else {
            encodings::MONO8
        }
    }
}

/// Perspective warper parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WarpImageParams {
    pub width: Option<i32>,
    pub height: Option<i32>,
    /// 3x3 matrix, row major
    pub transform: Vec<f64>,
}

impl WarpImageParams {
    pub fn output_size(&self) -> Result<OutputSize, ParamError> {
        match (self.width, self.height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => {
                Ok(OutputSize::Explicit { width, height })
            }
            (Some(width), Some(height)) => Err(ParamError::InvalidOutputSize { width, height }),
            _ => Ok(OutputSize::InheritFromInput),
        }
    }

    pub fn transform(&self) -> Result<TransformMatrix, ParamError> {
        TransformMatrix::from_row_major(&self.transform)
    }
}

/// Image saver parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSaverParams {
    pub directory: PathBuf,
    pub prefix: String,
}

impl Default for ImageSaverParams {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            prefix: "frame_".to_string(),
        }
    }
}

impl ImageSaverParams {
    /// Path of the `sequence`-th saved frame
    pub fn frame_path(&self, sequence: u64) -> PathBuf {
        self.directory.join(format!("{}{:04}.png", self.prefix, sequence))
    }
}

/// RGB color, 8 bits per channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels in OpenCV's (B, G, R) order
    pub fn bgr(&self) -> (u8, u8, u8) {
        (self.b, self.g, self.r)
    }
}

/// Ordered list of integer pixel coordinates; order is drawing order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polygon {
    points: Vec<(i32, i32)>,
}

impl Polygon {
    pub fn new(points: Vec<(i32, i32)>) -> Result<Self, ParamError> {
        if points.is_empty() {
            return Err(ParamError::EmptyPolygon);
        }
        Ok(Self { points })
    }

    /// Pair up separate x and y coordinate lists
    pub fn from_xy(x: Option<&[i64]>, y: Option<&[i64]>) -> Result<Self, ParamError> {
        let (x, y) = match (x, y) {
            (Some(x), Some(y)) if x.len() == y.len() => (x, y),
            _ => {
                return Err(ParamError::PolygonMismatch {
                    x: x.map(<[i64]>::len),
                    y: y.map(<[i64]>::len),
                });
            }
        };

        let points = x
            .iter()
            .zip(y)
            .map(|(&px, &py)| Ok((to_coordinate(px)?, to_coordinate(py)?)))
            .collect::<Result<Vec<_>, ParamError>>()?;

        Self::new(points)
    }

    pub fn points(&self) -> &[(i32, i32)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn to_coordinate(value: i64) -> Result<i32, ParamError> {
    i32::try_from(value).map_err(|_| ParamError::CoordinateOutOfRange(value))
}

/// Row-major 3x3 projective transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrix([[f64; 3]; 3]);

impl TransformMatrix {
    pub fn from_row_major(values: &[f64]) -> Result<Self, ParamError> {
        if values.len() != 9 {
            return Err(ParamError::TransformLength(values.len()));
        }

        let mut rows = [[0.0; 3]; 3];
        for (i, value) in values.iter().enumerate() {
            rows[i / 3][i % 3] = *value;
        }
        Ok(Self(rows))
    }

    pub fn rows(&self) -> &[[f64; 3]; 3] {
        &self.0
    }
}

impl fmt::Display for TransformMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<String> = self
            .0
            .iter()
            .map(|row| format!("{}, {}, {}", row[0], row[1], row[2]))
            .collect();
        write!(f, "[{}]", rows.join(";\n "))
    }
}

/// Size of the warped output canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSize {
    Explicit { width: i32, height: i32 },
    InheritFromInput,
}

impl OutputSize {
    /// Resolve against the size of the image being warped
    pub fn resolve(&self, input_width: i32, input_height: i32) -> (i32, i32) {
        match *self {
            OutputSize::Explicit { width, height } => (width, height),
            OutputSize::InheritFromInput => (input_width, input_height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_from_xy() -> Result<(), ParamError> {
        let polygon = Polygon::from_xy(Some(&[1, 5, 3][..]), Some(&[2, 6, 4][..]))?;
        assert_eq!(polygon.points(), &[(1, 2), (5, 6), (3, 4)]);
        Ok(())
    }

    #[test]
    fn test_polygon_rejects_mismatch() {
        assert!(matches!(
            Polygon::from_xy(Some(&[1, 2][..]), Some(&[1][..])),
            Err(ParamError::PolygonMismatch { x: Some(2), y: Some(1) })
        ));
        assert!(matches!(
            Polygon::from_xy(None, Some(&[1][..])),
            Err(ParamError::PolygonMismatch { x: None, .. })
        ));
        assert!(matches!(Polygon::from_xy(Some(&[][..]), Some(&[][..])), Err(ParamError::EmptyPolygon)));
    }

    #[test]
    fn test_polygon_rejects_huge_coordinates() {
        let big = i64::from(i32::MAX) + 1;
        assert!(matches!(
            Polygon::from_xy(Some(&[big][..]), Some(&[0][..])),
            Err(ParamError::CoordinateOutOfRange(v)) if v == big
        ));
    }

    #[test]
    fn test_transform_from_row_major() -> Result<(), ParamError> {
        let m = TransformMatrix::from_row_major(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0])?;
        assert_eq!(m.rows()[1], [4.0, 5.0, 6.0]);
        assert_eq!(m.rows()[2][0], 7.0);

        assert!(matches!(
            TransformMatrix::from_row_major(&[1.0; 8]),
            Err(ParamError::TransformLength(8))
        ));
        Ok(())
    }

    #[test]
    fn test_transform_display() -> Result<(), ParamError> {
        let m = TransformMatrix::from_row_major(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])?;
        assert_eq!(m.to_string(), "[1, 0, 0;\n 0, 1, 0;\n 0, 0, 1]");
        Ok(())
    }

    #[test]
    fn test_rate_is_clamped() {
        let params = ImagePubParams { rate: 0.01, ..Default::default() };
        assert_eq!(params.rate_hz(), MIN_PUBLISH_RATE);
        assert_eq!(params.period(), Duration::from_secs(10));

        let params = ImagePubParams { rate: 4.0, ..Default::default() };
        assert_eq!(params.period(), Duration::from_millis(250));

        let params = ImagePubParams { rate: f64::NAN, ..Default::default() };
        assert_eq!(params.rate_hz(), MIN_PUBLISH_RATE);
    }

    #[test]
    fn test_image_mode_selects_encoding() {
        let params = ImagePubParams::default();
        assert_eq!(params.encoding(), encodings::BGR8);

        let params = ImagePubParams { mode: "mono8".into(), ..Default::default() };
        assert_eq!(params.encoding(), encodings::MONO8);
    }

    #[test]
    fn test_output_size() -> Result<(), ParamError> {
        let params = WarpImageParams { width: Some(640), height: Some(480), ..Default::default() };
        assert_eq!(params.output_size()?.resolve(10, 10), (640, 480));

        let params = WarpImageParams { width: Some(640), ..Default::default() };
        assert_eq!(params.output_size()?, OutputSize::InheritFromInput);
        assert_eq!(params.output_size()?.resolve(10, 20), (10, 20));

        let params = WarpImageParams { width: Some(0), height: Some(480), ..Default::default() };
        assert!(params.output_size().is_err());
        Ok(())
    }

    #[test]
    fn test_saver_frame_path() {
        let params = ImageSaverParams {
            directory: PathBuf::from("out"),
            ..Default::default()
        };
        assert_eq!(params.frame_path(7), PathBuf::from("out/frame_0007.png"));
    }

    #[test]
    fn test_params_deserialize_with_defaults() -> Result<(), serde_json::Error> {
        let params: DrawPolygonParams = serde_json::from_str(
            r#"{ "thickness": 2, "r": 255, "polygon": { "x": [0, 10], "y": [0, 10] } }"#,
        )?;
        assert_eq!(params.thickness, 2);
        assert_eq!(params.color(), Color::new(255, 0, 0));
        assert_eq!(params.polygon.x.as_deref(), Some(&[0, 10][..]));

        let params: DrawPolygonParams = serde_json::from_str(r#"{ "r": 300, "g": -1, "b": 128 }"#)?;
        assert_eq!(params.color(), Color::new(255, 0, 128));

        let params: DrawPolygonParams = serde_json::from_str("{}")?;
        assert_eq!(params.thickness, -1);
        assert!(params.polygon().is_err());
        Ok(())
    }
}
