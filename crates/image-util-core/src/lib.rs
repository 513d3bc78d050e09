//! Image Util Core
//!
//! Messages, parameters and the in-process middleware shared by the image
//! components: topics, timers and process shutdown. Nothing here touches OpenCV.

pub mod error;
pub mod executor;
pub mod logging;
pub mod messages;
pub mod node;
pub mod params;
pub mod transport;

pub use error::ParamError;
pub use executor::{Context, Executor, Timer};
pub use messages::{encodings, Header, ImageMessage, Time};
pub use node::{NodeHandle, NodeOptions};
pub use params::{Color, OutputSize, Polygon, TransformMatrix};
pub use transport::{ImageTransport, Publisher, Subscriber};
