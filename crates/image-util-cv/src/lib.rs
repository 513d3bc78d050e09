//! Image Util Computer Vision Library
//!
//! OpenCV-backed image components that plug into the `image-util-core`
//! transport: polygon drawing, perspective warping, static image publishing
//! and frame saving.

pub mod bridge;
pub mod nodes;
pub mod utils;

// Re-export commonly used types
pub use bridge::{BridgeError, CvImage};
pub use nodes::{
    Component, ComponentKind, DrawPolygonNode, ImagePubNode, ImageSaverNode, WarpImageNode,
};
pub use utils::ImageUtils;

// Error handling
pub type Result<T> = anyhow::Result<T>;

/// Core traits for the CV components
pub mod traits {
    use super::*;

    /// A per-message image transform: one image in, one image out
    pub trait ImageOperation: Send + Sync {
        fn apply(&self, image: CvImage) -> Result<CvImage>;
    }
}
