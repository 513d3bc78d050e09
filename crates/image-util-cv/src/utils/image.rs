//! Image file utilities: OpenCV decoding for components, `image` crate encoding for saved frames

use crate::Result;
use anyhow::{bail, Context};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use image_util_core::{encodings, ImageMessage};
use opencv::{
    core::Mat,
    imgcodecs::{self, IMREAD_COLOR, IMREAD_GRAYSCALE},
};
use std::path::Path;

/// Image file helpers
pub struct ImageUtils;

impl ImageUtils {
    /// Decode a file as 3-channel BGR. Unreadable files give an empty `Mat`.
    pub fn load_mat_color<P: AsRef<Path>>(path: P) -> Result<Mat> {
        let path_str = path.as_ref().to_string_lossy();

        imgcodecs::imread(&path_str, IMREAD_COLOR)
            .with_context(|| format!("Failed to load color image: {}", path_str))
    }

    /// Decode a file as single-channel 8-bit. Unreadable files give an empty `Mat`.
    pub fn load_mat_grayscale<P: AsRef<Path>>(path: P) -> Result<Mat> {
        let path_str = path.as_ref().to_string_lossy();

        imgcodecs::imread(&path_str, IMREAD_GRAYSCALE)
            .with_context(|| format!("Failed to load grayscale image: {}", path_str))
    }

    /// Decode a file in the layout matching `encoding` (`bgr8` or `mono8`)
    pub fn load_mat<P: AsRef<Path>>(path: P, encoding: &str) -> Result<Mat> {
        match encoding {
            encodings::BGR8 => Self::load_mat_color(path),
            encodings::MONO8 => Self::load_mat_grayscale(path),
            other => bail!("Cannot load an image file as '{}'", other),
        }
    }

    /// Convert a packed 8-bit message into an `image` buffer, reordering BGR to RGB
    pub fn message_to_dynamic_image(msg: &ImageMessage) -> Result<DynamicImage> {
        let row_bytes = msg
            .row_bytes()
            .with_context(|| format!("Unsupported encoding: {}", msg.encoding))?;

        let mut pixels = Vec::with_capacity(row_bytes * msg.height as usize);
        for row in 0..msg.height as usize {
            let start = row * msg.step as usize;
            let slice = msg
                .data
                .get(start..start + row_bytes)
                .with_context(|| format!("Image data ends before row {}", row))?;
            pixels.extend_from_slice(slice);
        }

        let (width, height) = (msg.width, msg.height);
        let image = match msg.encoding.as_str() {
            encodings::MONO8 => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
            encodings::RGB8 => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
            encodings::BGR8 => {
                for px in pixels.chunks_exact_mut(3) {
                    px.swap(0, 2);
                }
                RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
            }
            encodings::RGBA8 => RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8),
            encodings::BGRA8 => {
                for px in pixels.chunks_exact_mut(4) {
                    px.swap(0, 2);
                }
                RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8)
            }
            other => bail!("Cannot save '{}' images", other),
        };

        image.context("Image buffer does not match its dimensions")
    }

    /// Save a message to disk, format chosen by the file extension
    pub fn save_message<P: AsRef<Path>>(msg: &ImageMessage, path: P) -> Result<()> {
        let image = Self::message_to_dynamic_image(msg)?;

        image
            .save(&path)
            .with_context(|| format!("Failed to save image: {:?}", path.as_ref()))?;

        Ok(())
    }
}
