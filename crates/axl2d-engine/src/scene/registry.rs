use std::any::TypeId;
use std::fmt;

use crate::error::ConfigError;

use super::Scene;

/// Identity of a scene type.
#[derive(Copy, Clone, Eq)]
pub struct SceneId {
    type_id: TypeId,
    name: &'static str,
}

impl SceneId {
    pub fn of<T: Scene>() -> Self {
        let full = std::any::type_name::<T>();
        Self {
            type_id: TypeId::of::<T>(),
            name: full.rsplit("::").next().unwrap_or(full),
        }
    }

    /// Short type name, for logs and errors.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for SceneId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl std::hash::Hash for SceneId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SceneId({})", self.name)
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

type Factory = Box<dyn Fn() -> Box<dyn Scene>>;

fn factory_of<T: Scene>(make: impl Fn() -> T + 'static) -> Factory {
    Box::new(move || -> Box<dyn Scene> { Box::new(make()) })
}

struct Entry {
    id: SceneId,
    is_default: bool,
    factory: Factory,
}

/// Scene types known to the host, registered explicitly at startup.
///
/// Every resolve produces a fresh instance from the registered factory.
#[derive(Default)]
pub struct SceneRegistry {
    entries: Vec<Entry>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Scene + Default>(&mut self) -> Result<&mut Self, ConfigError> {
        self.insert(SceneId::of::<T>(), false, factory_of(T::default))
    }

    /// Registers the scene shown when the host starts.
    pub fn register_default<T: Scene + Default>(&mut self) -> Result<&mut Self, ConfigError> {
        self.insert(SceneId::of::<T>(), true, factory_of(T::default))
    }

    /// Registers `T` with a custom factory.
    pub fn register_with<T: Scene>(
        &mut self,
        factory: impl Fn() -> T + 'static,
    ) -> Result<&mut Self, ConfigError> {
        self.insert(SceneId::of::<T>(), false, factory_of(factory))
    }

    /// Registers the default scene with a custom factory.
    pub fn register_default_with<T: Scene>(
        &mut self,
        factory: impl Fn() -> T + 'static,
    ) -> Result<&mut Self, ConfigError> {
        self.insert(SceneId::of::<T>(), true, factory_of(factory))
    }

    fn insert(
        &mut self,
        id: SceneId,
        is_default: bool,
        factory: Factory,
    ) -> Result<&mut Self, ConfigError> {
        if self.contains(id) {
            return Err(ConfigError::DuplicateScene(id.name()));
        }
        log::debug!("scene `{id}` registered{}", if is_default { " (default)" } else { "" });
        self.entries.push(Entry {
            id,
            is_default,
            factory,
        });
        Ok(self)
    }

    /// Creates a fresh instance of `id`.
    pub fn resolve(&self, id: SceneId) -> Result<Box<dyn Scene>, ConfigError> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| (e.factory)())
            .ok_or(ConfigError::SceneNotRegistered(id.name()))
    }

    /// The single scene registered as default.
    pub fn default_scene(&self) -> Result<SceneId, ConfigError> {
        let defaults: Vec<SceneId> = self
            .entries
            .iter()
            .filter(|e| e.is_default)
            .map(|e| e.id)
            .collect();

        match defaults.as_slice() {
            [] => Err(ConfigError::NoDefaultScene),
            [id] => Ok(*id),
            many => Err(ConfigError::MultipleDefaultScenes(
                many.iter().map(|id| id.name()).collect(),
            )),
        }
    }

    pub fn contains(&self, id: SceneId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for SceneRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (e.id, e.is_default)))
            .finish()
    }
}
