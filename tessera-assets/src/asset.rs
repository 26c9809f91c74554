//! The loaded asset itself: a small polymorphic container plus the minimal class-descriptor
//! lookup that stands in for the engine's full RTTI/reflection registry, which is out of
//! scope here.

use crate::asset_id::AssetId;
use crate::shader::driver::ShaderModule;
use fxhash::FxHashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};

/// Opaque handle naming one of the asset classes the manager knows how to build. Stands in
/// for a lookup into the engine's reflection registry (`find_class(name) -> ClassDescriptor`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDescriptor(Arc<str>);

impl ClassDescriptor {
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Minimal stand-in for the RTTI registry: a name -> [`ClassDescriptor`] table. Asset classes
/// register themselves once at startup; meta resolution looks classes up by the symbolic name
/// carried in the pak's descriptor.
#[derive(Default)]
pub struct ClassRegistry {
    classes: Mutex<FxHashMap<String, ClassDescriptor>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        let registry = Self::default();
        for builtin in ["texture", "shader_program", "audio_stream", "scene"] {
            registry.register(builtin);
        }
        registry
    }

    pub fn register(&self, name: impl Into<String>) {
        let name = name.into();
        let descriptor = ClassDescriptor(Arc::from(name.as_str()));
        self.classes.lock().insert(name, descriptor);
    }

    pub fn find_class(&self, name: &str) -> Option<ClassDescriptor> {
        self.classes.lock().get(name).cloned()
    }
}

/// A decoded texture: CPU-side pixels, already resized by the (external, pure-function)
/// image decoder.
#[derive(Clone)]
pub struct TextureAsset {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

/// A decoded PCM audio stream.
#[derive(Clone)]
pub struct AudioStreamAsset {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Arc<[u8]>,
}

/// A compiled, GPU-resident shader program, the product of [`crate::shader::builder`].
#[derive(Clone)]
pub struct ShaderProgramAsset {
    pub cache_key: String,
    pub module: ShaderModule,
}

/// A loaded scene graph root. The scene graph itself is out of scope; this only carries
/// enough to prove the dependency was satisfied.
#[derive(Clone)]
pub struct SceneAsset {
    pub root_name: String,
}

/// The payload of an [`Asset`], tagged by which loader produced it.
#[derive(Clone)]
pub enum AssetData {
    Texture(TextureAsset),
    ShaderProgram(ShaderProgramAsset),
    AudioStream(AudioStreamAsset),
    Scene(SceneAsset),
}

struct AssetInner {
    name: RwLock<AssetId>,
    class: ClassDescriptor,
    data: AssetData,
}

/// A fully realized asset. Every asset carries a name and is reference counted; the manager's
/// cache holds only a [`Weak`] reference, so an `Asset`'s lifetime is governed entirely by how
/// many strong clones of it are outstanding.
#[derive(Clone)]
pub struct Asset(Arc<AssetInner>);

impl Asset {
    pub fn new(name: AssetId, class: ClassDescriptor, data: AssetData) -> Self {
        Self(Arc::new(AssetInner {
            name: RwLock::new(name),
            class,
            data,
        }))
    }

    pub fn name(&self) -> AssetId {
        self.0.name.read().clone()
    }

    /// Stamps the asset's name if it was constructed with a placeholder (empty) one. Used by
    /// the manager right after a loader returns, since loaders don't always know the id the
    /// request was made under.
    pub fn set_name_if_empty(&self, name: &AssetId) {
        let mut current = self.0.name.write();
        if current.as_str().is_empty() {
            *current = name.clone();
        }
    }

    pub fn class(&self) -> &ClassDescriptor {
        &self.0.class
    }

    pub fn data(&self) -> &AssetData {
        &self.0.data
    }

    /// Number of strong references outstanding, including this one.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub(crate) fn downgrade(&self) -> WeakAsset {
        WeakAsset(Arc::downgrade(&self.0))
    }
}

/// Weak reference the cache stores; upgrading it is how `find`/`gc` observe whether the asset
/// is still alive anywhere else.
#[derive(Clone)]
pub(crate) struct WeakAsset(Weak<AssetInner>);

impl WeakAsset {
    pub fn upgrade(&self) -> Option<Asset> {
        self.0.upgrade().map(Asset)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn class_registry_resolves_builtins() {
        let registry = ClassRegistry::new();
        assert!(registry.find_class("texture").is_some());
        assert!(registry.find_class("not_a_class").is_none());
    }

    #[test]
    fn set_name_if_empty_only_stamps_once() {
        let class = ClassRegistry::new().find_class("scene").unwrap();
        let asset = Asset::new(
            AssetId::new(""),
            class,
            AssetData::Scene(SceneAsset {
                root_name: "root".into(),
            }),
        );
        asset.set_name_if_empty(&AssetId::new("level_1"));
        assert_eq!(asset.name().as_str(), "level_1");
        asset.set_name_if_empty(&AssetId::new("level_2"));
        assert_eq!(asset.name().as_str(), "level_1");
    }

    #[test]
    fn weak_ref_does_not_keep_asset_alive() {
        let class = ClassRegistry::new().find_class("scene").unwrap();
        let asset = Asset::new(
            AssetId::new("x"),
            class,
            AssetData::Scene(SceneAsset {
                root_name: "root".into(),
            }),
        );
        let weak = asset.downgrade();
        assert!(weak.upgrade().is_some());
        drop(asset);
        assert!(weak.upgrade().is_none());
    }
}
