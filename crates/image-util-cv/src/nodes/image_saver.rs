//! Writes every received image to a numbered PNG file

use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use image_util_core::params::ImageSaverParams;
use image_util_core::{NodeHandle, Subscriber};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct ImageSaverNode {
    name: String,
    saved: Arc<AtomicU64>,
    _subscriber: Subscriber,
}

impl ImageSaverNode {
    pub fn new(node: NodeHandle) -> Result<Self> {
        let params: ImageSaverParams = node.parameters()?;
        std::fs::create_dir_all(&params.directory)
            .with_context(|| format!("Failed to create output directory: {:?}", params.directory))?;

        let saved = Arc::new(AtomicU64::new(0));
        let subscriber = {
            let saved = saved.clone();
            let name = node.name().to_string();
            let mut sequence = 0u64;

            node.subscribe("image", move |msg| {
                let path = params.frame_path(sequence);
                sequence += 1;

                match ImageUtils::save_message(&msg, &path) {
                    Ok(()) => {
                        saved.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(node = %name, path = ?path, "Saved image");
                    }
                    Err(e) => tracing::error!(node = %name, "Dropping image: {:#}", e),
                }
            })
        };

        Ok(Self {
            name: node.name().to_string(),
            saved,
            _subscriber: subscriber,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of images written so far
    pub fn saved_count(&self) -> u64 {
        self.saved.load(Ordering::Relaxed)
    }
}
