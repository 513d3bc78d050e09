//! Launch files: which components to load into one process, and how

use anyhow::{Context as _, Result};
use image_util_core::{Context, ImageTransport, NodeOptions};
use image_util_cv::{Component, ComponentKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    pub components: Vec<ComponentEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentEntry {
    pub kind: ComponentKind,
    #[serde(flatten)]
    pub options: NodeOptions,
}

impl LaunchConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read launch file: {:?}", path.as_ref()))?;

        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse launch file: {:?}", path.as_ref()))
    }
}

/// Load every component of `config` into a shared context and transport.
///
/// A component that fails to load is logged and skipped so the others keep
/// running, unless its failure requested process shutdown.
pub fn load_components(
    config: &LaunchConfig,
    context: &Context,
    transport: &ImageTransport,
) -> Result<Vec<Component>> {
    let mut components = Vec::with_capacity(config.components.len());

    for entry in &config.components {
        match Component::load(entry.kind, context, transport, entry.options.clone()) {
            Ok(component) => {
                tracing::info!(kind = %entry.kind, name = component.name(), "Loaded component");
                components.push(component);
            }
            Err(e) if !context.ok() => {
                return Err(e.context(format!("Component '{}' requested shutdown", entry.kind)));
            }
            Err(e) => {
                tracing::error!(kind = %entry.kind, "Failed to load component: {:#}", e);
            }
        }
    }

    Ok(components)
}
