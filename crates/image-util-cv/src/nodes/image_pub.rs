//! Publishes one image file over and over at a fixed rate

use crate::bridge::CvImage;
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::bail;
use image_util_core::params::ImagePubParams;
use image_util_core::{fatal, Header, ImageMessage, NodeHandle, Publisher, Time, Timer};
use opencv::prelude::*;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// The decoded file plus the publisher it goes out on. Only the stamp changes.
struct CachedImage {
    message: Mutex<ImageMessage>,
    publisher: Publisher,
}

impl CachedImage {
    fn publish(&self) -> ImageMessage {
        let message = {
            let mut cached = self.message.lock().unwrap_or_else(PoisonError::into_inner);
            cached.header.stamp = Time::now();
            cached.clone()
        };

        self.publisher.publish(message.clone());
        message
    }
}

/// Advertises a latched `image` topic fed by a wall timer
pub struct ImagePubNode {
    name: String,
    cache: Arc<CachedImage>,
    timer: Timer,
}

impl ImagePubNode {
    /// Fails, and requests process shutdown, when the file cannot be decoded
    pub fn new(node: NodeHandle) -> Result<Self> {
        let params: ImagePubParams = node.parameters()?;
        let encoding = params.encoding();

        let image = match ImageUtils::load_mat(&params.image_file, encoding) {
            Ok(image) if !image.empty() => image,
            Ok(_) => {
                fatal!(node = %node.name(), path = ?params.image_file, "Failed to load image.");
                node.context().shutdown("failed to load image");
                bail!("Failed to load image: {:?}", params.image_file);
            }
            Err(e) => {
                fatal!(node = %node.name(), path = ?params.image_file, "Failed to load image: {:#}", e);
                node.context().shutdown("failed to load image");
                return Err(e);
            }
        };

        let header = Header {
            stamp: Time::now(),
            frame_id: String::new(),
        };
        let message = CvImage::new(header, encoding, image).to_image_msg()?;

        let cache = Arc::new(CachedImage {
            message: Mutex::new(message),
            publisher: node.advertise("image", true),
        });

        let timer = {
            let cache = cache.clone();
            node.create_wall_timer(params.period(), move || {
                cache.publish();
            })
        };

        tracing::info!(
            node = %node.name(),
            path = ?params.image_file,
            encoding,
            rate = params.rate_hz(),
            "Publishing static image"
        );

        Ok(Self {
            name: node.name().to_string(),
            cache,
            timer,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> Duration {
        self.timer.period()
    }

    /// Publish the cached image now with a fresh stamp, as a timer tick does
    pub fn publish(&self) -> ImageMessage {
        self.cache.publish()
    }
}
