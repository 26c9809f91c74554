//! Read-only asset sources. A pak answers "what is this id, and how do I build it" by filling
//! in an [`AssetMeta`]; the manager asks every registered pak, in registration order, until one
//! of them knows the id.

use crate::asset::ClassDescriptor;
use crate::asset_id::AssetId;
use crate::error::Status;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tessera_core::log::Log;

/// Resolved descriptor of how to build one asset. Produced by [`AssetPak::get_meta`], consumed
/// by the manager and, through it, by the selected [`crate::loader::AssetLoader`].
#[derive(Clone)]
pub struct AssetMeta {
    pub cls: ClassDescriptor,
    /// Symbolic name of the loader registered on the manager that knows how to build this
    /// class of asset.
    pub loader: String,
    /// Back-reference to the pak that produced this meta, so the loader can pull raw bytes
    /// without the manager needing to plumb them through separately.
    pub pak: Arc<dyn AssetPak>,
    pub deps: Vec<AssetId>,
    /// Opaque subtree from the pak's descriptor, handed to the loader as-is.
    pub import_options: serde_yaml::Value,
}

/// A read-only provider of asset metadata and bytes. Backed by a directory, a packed archive,
/// or an in-memory library; the manager doesn't care which.
pub trait AssetPak: Send + Sync {
    fn name(&self) -> &str;

    /// Fills in a meta for `id` if this pak knows it. `self_arc` is this same pak, handed back
    /// so the resulting [`AssetMeta::pak`] can hold a cheap `Arc` clone of it.
    fn get_meta(&self, id: &AssetId, self_arc: &Arc<dyn AssetPak>) -> Result<AssetMeta, Status>;

    /// Reads the raw bytes for a path relative to this pak's namespace.
    fn read_bytes(&self, rel_path: &str) -> Result<Vec<u8>, Status>;
}

#[derive(Deserialize)]
struct RawMeta {
    class: String,
    #[serde(default)]
    loader: String,
    #[serde(default)]
    deps: Vec<String>,
    #[serde(default)]
    params: serde_yaml::Value,
}

/// Canonical pak: a file system namespace where each asset `id` has a `<id>.yaml` descriptor
/// sitting next to its source data.
pub struct FsPak {
    name: String,
    root: PathBuf,
    classes: Arc<crate::asset::ClassRegistry>,
}

impl FsPak {
    pub fn new(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        classes: Arc<crate::asset::ClassRegistry>,
    ) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            classes,
        }
    }

    fn descriptor_path(&self, id: &AssetId) -> PathBuf {
        self.root.join(format!("{}.yaml", id.as_str()))
    }
}

impl AssetPak for FsPak {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_meta(&self, id: &AssetId, self_arc: &Arc<dyn AssetPak>) -> Result<AssetMeta, Status> {
        let path = self.descriptor_path(id);
        let bytes = std::fs::read(&path).map_err(|_| Status::NotFound)?;

        let raw: RawMeta = serde_yaml::from_slice(&bytes).map_err(|e| {
            Log::warn(format!("malformed asset descriptor {}: {e}", path.display()));
            Status::FailedParse
        })?;

        let cls = self.classes.find_class(&raw.class).ok_or_else(|| {
            Log::warn(format!("unknown asset class {:?} for {}", raw.class, id));
            Status::InvalidData
        })?;

        if raw.loader.is_empty() {
            Log::warn(format!("descriptor for {id} has no loader bound"));
            return Err(Status::InvalidData);
        }

        Ok(AssetMeta {
            cls,
            loader: raw.loader,
            pak: self_arc.clone(),
            deps: raw.deps.into_iter().map(AssetId::new).collect(),
            import_options: raw.params,
        })
    }

    fn read_bytes(&self, rel_path: &str) -> Result<Vec<u8>, Status> {
        std::fs::read(self.root.join(rel_path)).map_err(|_| Status::FailedRead)
    }
}
