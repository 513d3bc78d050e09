//! Per-component view of the process: name, topics, parameters, timers

use crate::error::ParamError;
use crate::executor::{Context, Timer};
use crate::messages::ImageMessage;
use crate::transport::{ImageTransport, Publisher, Subscriber};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// How a component instance is named, wired and configured
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeOptions {
    pub name: Option<String>,
    /// Topic name used by the component -> topic name on the transport
    pub remappings: HashMap<String, String>,
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl NodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn remap(mut self, from: &str, to: &str) -> Self {
        self.remappings.insert(from.to_string(), to.to_string());
        self
    }

    /// Merge the fields of a JSON object into the parameter set
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        if let serde_json::Value::Object(map) = parameters {
            self.parameters.extend(map);
        }
        self
    }
}

/// Handle a component uses to reach the transport and the executor
#[derive(Clone)]
pub struct NodeHandle {
    name: String,
    context: Context,
    transport: ImageTransport,
    options: NodeOptions,
}

impl NodeHandle {
    pub fn new(
        default_name: &str,
        context: &Context,
        transport: &ImageTransport,
        options: NodeOptions,
    ) -> Self {
        Self {
            name: options.name.clone().unwrap_or_else(|| default_name.to_string()),
            context: context.clone(),
            transport: transport.clone(),
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn transport(&self) -> &ImageTransport {
        &self.transport
    }

    /// Apply remappings to a topic name
    pub fn resolve_topic(&self, topic: &str) -> String {
        self.options
            .remappings
            .get(topic)
            .cloned()
            .unwrap_or_else(|| topic.to_string())
    }

    /// Deserialize the parameter set; absent fields take their defaults
    pub fn parameters<T: DeserializeOwned>(&self) -> Result<T, ParamError> {
        let value = serde_json::Value::Object(self.options.parameters.clone());
        Ok(serde_json::from_value(value)?)
    }

    pub fn advertise(&self, topic: &str, latch: bool) -> Publisher {
        self.transport.advertise(&self.resolve_topic(topic), latch)
    }

    pub fn subscribe<F>(&self, topic: &str, callback: F) -> Subscriber
    where
        F: FnMut(Arc<ImageMessage>) + Send + 'static,
    {
        self.transport.subscribe(&self.resolve_topic(topic), callback)
    }

    pub fn create_wall_timer<F>(&self, period: Duration, callback: F) -> Timer
    where
        F: FnMut() + Send + 'static,
    {
        self.context.create_wall_timer(period, callback)
    }
}
