//! Conversion between transport image messages and OpenCV matrices

use crate::Result;
use anyhow::Context;
use image_util_core::{encodings, Header, ImageMessage};
use opencv::{
    core::{Mat, Scalar, CV_16UC1, CV_8UC1, CV_8UC3, CV_8UC4},
    prelude::*,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("unsupported encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("image step {step} is shorter than a row of {row_bytes} bytes")]
    StepTooSmall { step: usize, row_bytes: usize },

    #[error("image data holds {actual} bytes, {expected} expected for {height} rows")]
    TruncatedData { expected: usize, actual: usize, height: u32 },

    #[error("matrix type {mat_type} does not match encoding '{encoding}'")]
    TypeMismatch { mat_type: i32, encoding: String },
}

/// OpenCV matrix type used to hold pixels of the given encoding
pub fn mat_type_for(encoding: &str) -> std::result::Result<i32, BridgeError> {
    match encoding {
        encodings::MONO8 => Ok(CV_8UC1),
        encodings::MONO16 => Ok(CV_16UC1),
        encodings::BGR8 | encodings::RGB8 => Ok(CV_8UC3),
        encodings::BGRA8 | encodings::RGBA8 => Ok(CV_8UC4),
        other => Err(BridgeError::UnsupportedEncoding(other.to_string())),
    }
}

/// An image held as an OpenCV matrix together with its message metadata
#[derive(Debug)]
pub struct CvImage {
    pub header: Header,
    pub encoding: String,
    pub image: Mat,
}

impl CvImage {
    pub fn new(header: Header, encoding: &str, image: Mat) -> Self {
        Self {
            header,
            encoding: encoding.to_string(),
            image,
        }
    }

    /// Copy a message into a freshly allocated, continuous matrix
    pub fn from_msg(msg: &ImageMessage) -> Result<Self> {
        let mat_type = mat_type_for(&msg.encoding)?;
        let row_bytes = msg
            .row_bytes()
            .ok_or_else(|| BridgeError::UnsupportedEncoding(msg.encoding.clone()))?;
        let step = msg.step as usize;

        if step < row_bytes {
            return Err(BridgeError::StepTooSmall { step, row_bytes }.into());
        }

        let height = msg.height as usize;
        let expected = if height == 0 { 0 } else { step * (height - 1) + row_bytes };
        if msg.data.len() < expected {
            return Err(BridgeError::TruncatedData {
                expected,
                actual: msg.data.len(),
                height: msg.height,
            }
            .into());
        }

        let mut image = Mat::new_rows_cols_with_default(
            msg.height as i32,
            msg.width as i32,
            mat_type,
            Scalar::all(0.0),
        )
        .context("Failed to allocate image matrix")?;

        if row_bytes > 0 && height > 0 {
            let dst = image.data_bytes_mut().context("Failed to access matrix data")?;
            for (row, chunk) in dst.chunks_exact_mut(row_bytes).enumerate() {
                let start = row * step;
                chunk.copy_from_slice(&msg.data[start..start + row_bytes]);
            }

            if msg.is_bigendian != 0 && encodings::bit_depth(&msg.encoding) == Some(16) {
                for pair in dst.chunks_exact_mut(2) {
                    pair.swap(0, 1);
                }
            }
        }

        Ok(Self {
            header: msg.header.clone(),
            encoding: msg.encoding.clone(),
            image,
        })
    }

    /// Pack the matrix into a message with no row padding
    pub fn to_image_msg(&self) -> Result<ImageMessage> {
        let mat_type = mat_type_for(&self.encoding)?;
        if !self.image.empty() && self.image.typ() != mat_type {
            return Err(BridgeError::TypeMismatch {
                mat_type: self.image.typ(),
                encoding: self.encoding.clone(),
            }
            .into());
        }

        let data = if self.image.empty() {
            Vec::new()
        } else if self.image.is_continuous() {
            self.image.data_bytes()?.to_vec()
        } else {
            self.image.try_clone()?.data_bytes()?.to_vec()
        };

        let elem_size = if self.image.empty() { 0 } else { self.image.elem_size()? };

        Ok(ImageMessage {
            header: self.header.clone(),
            height: self.image.rows().max(0) as u32,
            width: self.image.cols().max(0) as u32,
            encoding: self.encoding.clone(),
            is_bigendian: 0,
            step: (self.image.cols().max(0) as usize * elem_size) as u32,
            data,
        })
    }
}
