//! Loadable image components

pub mod draw_polygon;
pub mod image_pub;
pub mod image_saver;
pub mod warp_image;

pub use draw_polygon::{DrawPolygonNode, PolygonDrawing};
pub use image_pub::ImagePubNode;
pub use image_saver::ImageSaverNode;
pub use warp_image::{PerspectiveWarp, WarpImageNode};

use crate::bridge::CvImage;
use crate::traits::ImageOperation;
use crate::Result;
use image_util_core::{Context, ImageTransport, NodeHandle, NodeOptions, Publisher, Subscriber};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Every component type a container can load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    DrawPolygon,
    ImagePub,
    WarpImage,
    ImageSaver,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 4] = [
        ComponentKind::DrawPolygon,
        ComponentKind::ImagePub,
        ComponentKind::WarpImage,
        ComponentKind::ImageSaver,
    ];

    /// Node name used when the options do not give one
    pub fn default_name(&self) -> &'static str {
        match self {
            ComponentKind::DrawPolygon => "draw_polygon",
            ComponentKind::ImagePub => "image_pub",
            ComponentKind::WarpImage => "warp_image",
            ComponentKind::ImageSaver => "image_saver",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ComponentKind::DrawPolygon => "draws a fixed polygon on every image (image_in -> image_out)",
            ComponentKind::ImagePub => "republishes one image file at a fixed rate (-> image)",
            ComponentKind::WarpImage => "applies a fixed perspective transform (image -> warped_image)",
            ComponentKind::ImageSaver => "writes every image to a numbered PNG file (image ->)",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.default_name())
    }
}

/// A loaded component; dropping it tears down its subscriptions and timers
pub enum Component {
    DrawPolygon(DrawPolygonNode),
    ImagePub(ImagePubNode),
    WarpImage(WarpImageNode),
    ImageSaver(ImageSaverNode),
}

impl Component {
    pub fn load(
        kind: ComponentKind,
        context: &Context,
        transport: &ImageTransport,
        options: NodeOptions,
    ) -> Result<Self> {
        let node = NodeHandle::new(kind.default_name(), context, transport, options);

        Ok(match kind {
            ComponentKind::DrawPolygon => Component::DrawPolygon(DrawPolygonNode::new(node)?),
            ComponentKind::ImagePub => Component::ImagePub(ImagePubNode::new(node)?),
            ComponentKind::WarpImage => Component::WarpImage(WarpImageNode::new(node)?),
            ComponentKind::ImageSaver => Component::ImageSaver(ImageSaverNode::new(node)?),
        })
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::DrawPolygon(_) => ComponentKind::DrawPolygon,
            Component::ImagePub(_) => ComponentKind::ImagePub,
            Component::WarpImage(_) => ComponentKind::WarpImage,
            Component::ImageSaver(_) => ComponentKind::ImageSaver,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Component::DrawPolygon(node) => node.name(),
            Component::ImagePub(node) => node.name(),
            Component::WarpImage(node) => node.name(),
            Component::ImageSaver(node) => node.name(),
        }
    }
}

/// Subscribe `operation` to `input`, publishing each result on `publisher`.
/// Messages that fail to convert or process are logged and dropped.
pub(crate) fn subscribe_operation(
    node: &NodeHandle,
    input: &str,
    publisher: Publisher,
    operation: Arc<dyn ImageOperation>,
) -> Subscriber {
    let name = node.name().to_string();

    node.subscribe(input, move |msg| {
        let result = CvImage::from_msg(&msg)
            .and_then(|image| operation.apply(image))
            .and_then(|image| image.to_image_msg());

        match result {
            Ok(output) => {
                publisher.publish(output);
            }
            Err(e) => tracing::error!(node = %name, "Dropping image: {:#}", e),
        }
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use image_util_core::{encodings, ImageMessage, ImageTransport, Subscriber};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    /// Per-test directory under the system temp dir, removed on drop
    pub struct ScratchDir(PathBuf);

    impl ScratchDir {
        pub fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!("image-util-{}-{}", name, std::process::id()));
            let _ = std::fs::remove_dir_all(&dir);
            std::fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }

        pub fn path(&self) -> &Path {
            &self.0
        }

        pub fn join(&self, name: &str) -> PathBuf {
            self.0.join(name)
        }
    }

    impl Drop for ScratchDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    pub type Received = Arc<Mutex<Vec<Arc<ImageMessage>>>>;

    pub fn collect(transport: &ImageTransport, topic: &str) -> (Subscriber, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let subscriber = transport.subscribe(topic, move |msg| sink.lock().unwrap().push(msg));
        (subscriber, received)
    }

    /// BGR image filled with a horizontal gradient so every column differs
    pub fn gradient_bgr(width: u32, height: u32) -> ImageMessage {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(x * 7) as u8, (y * 11) as u8, ((x + y) * 3) as u8]);
            }
        }

        ImageMessage {
            height,
            width,
            encoding: encodings::BGR8.to_string(),
            step: width * 3,
            data,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_names_round_trip_through_serde() -> Result<()> {
        for kind in ComponentKind::ALL {
            let encoded = serde_json::to_value(kind)?;
            assert_eq!(encoded, json!(kind.default_name()));
            assert_eq!(serde_json::from_value::<ComponentKind>(encoded)?, kind);
        }
        Ok(())
    }

    #[test]
    fn test_load_uses_default_name() -> Result<()> {
        let context = Context::new();
        let transport = ImageTransport::new();
        let options = NodeOptions::new().with_parameters(json!({ "transform": [1, 0, 0, 0, 1, 0, 0, 0, 1] }));

        let component = Component::load(ComponentKind::WarpImage, &context, &transport, options)?;
        assert_eq!(component.kind(), ComponentKind::WarpImage);
        assert_eq!(component.name(), "warp_image");
        assert_eq!(transport.subscriber_count("image"), 1);
        Ok(())
    }
}
