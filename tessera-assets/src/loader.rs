//! Pluggable format decoders and the registry the manager looks them up in.
//!
//! Shaped after `fyrox-resource`'s `ResourceLoader` / `ResourceLoadersContainer`, except keyed
//! by the symbolic name carried in [`crate::pak::AssetMeta::loader`] rather than by file
//! extension — this pipeline resolves the loader during meta resolution, not at request time.

use crate::asset::Asset;
use crate::asset_id::AssetId;
use crate::error::Status;
use crate::pak::AssetMeta;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// One format decoder, registered under a stable name. Implementations must be safe to invoke
/// concurrently for distinct assets: the manager runs loaders on arbitrary worker threads with
/// no external synchronization beyond what the loader brings itself.
pub trait AssetLoader: Send + Sync {
    /// The symbolic name paks refer to this loader by.
    fn name(&self) -> &str;

    fn load(&self, id: &AssetId, meta: &AssetMeta) -> Result<Asset, Status>;
}

/// Name -> loader table. Registering under a name already in use replaces the previous loader
/// and hands it back, mirroring `ResourceLoadersContainer::set`.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: RwLock<FxHashMap<String, Arc<dyn AssetLoader>>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, loader: Arc<dyn AssetLoader>) -> Option<Arc<dyn AssetLoader>> {
        self.loaders
            .write()
            .insert(loader.name().to_owned(), loader)
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn AssetLoader>> {
        self.loaders.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.loaders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.read().is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct StubLoader(&'static str);
    impl AssetLoader for StubLoader {
        fn name(&self) -> &str {
            self.0
        }
        fn load(&self, _id: &AssetId, _meta: &AssetMeta) -> Result<Asset, Status> {
            unreachable!("not exercised in this test")
        }
    }

    #[test]
    fn add_and_find() {
        let registry = LoaderRegistry::new();
        assert!(registry.is_empty());
        registry.add(Arc::new(StubLoader("tex2d")));
        assert_eq!(registry.len(), 1);
        assert!(registry.find("tex2d").is_some());
        assert!(registry.find("missing").is_none());
    }

    #[test]
    fn re_registering_replaces_and_returns_previous() {
        let registry = LoaderRegistry::new();
        registry.add(Arc::new(StubLoader("tex2d")));
        let previous = registry.add(Arc::new(StubLoader("tex2d")));
        assert!(previous.is_some());
        assert_eq!(registry.len(), 1);
    }
}
