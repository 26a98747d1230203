//! Scene descriptions and the registry drivers use to look them up by name.

use crate::camera::CameraConfig;
use crate::error::{RenderError, RenderResult};
use crate::surface::Object;
use std::collections::BTreeMap;
use std::fmt;

/// Camera plus the objects to render.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub camera: CameraConfig,
    pub objects: Vec<Object>,
}

impl Scene {
    pub fn new(camera: CameraConfig) -> Self {
        Self {
            camera,
            objects: Vec::new(),
        }
    }

    /// Add an object to the scene.
    pub fn add(&mut self, object: Object) -> &mut Self {
        self.objects.push(object);
        self
    }

    pub fn extend(&mut self, objects: impl IntoIterator<Item = Object>) -> &mut Self {
        self.objects.extend(objects);
        self
    }
}

type SceneFactory = Box<dyn Fn() -> Scene + Send + Sync>;

/// Named scene factories.
///
/// Built once by the driver at startup and passed to whatever needs it.
#[derive(Default)]
pub struct SceneRegistry {
    factories: BTreeMap<String, SceneFactory>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any earlier registration.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Scene + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Box::new(factory)).is_some() {
            log::warn!("Scene '{name}' registered twice; keeping the latest");
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build a fresh copy of the named scene.
    pub fn build(&self, name: &str) -> RenderResult<Scene> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RenderError::UnknownScene(name.to_string()))?;
        Ok(factory())
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for SceneRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneRegistry")
            .field("scenes", &self.names())
            .finish()
    }
}
