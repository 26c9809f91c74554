//! Asynchronous asset pipeline: the completion primitive ([`async_state`]/[`async_handle`])
//! and task scheduler ([`task`]/[`task_manager`]) everything else is built from, the asset
//! manager that turns `load_async` calls into a minimal set of loader invocations
//! ([`manager`]), the pluggable [`loader`]/[`pak`] contracts it dispatches through, and the
//! shader bytecode cache and builder ([`shader`]) that is the canonical non-trivial loader.

pub mod asset;
pub mod asset_id;
pub mod async_handle;
pub mod async_state;
pub mod error;
pub mod events;
pub mod loader;
pub mod manager;
pub mod pak;
pub mod shader;
pub mod task;
pub mod task_manager;
pub mod texture_loader;

pub use asset::{Asset, AssetData, ClassDescriptor, ClassRegistry};
pub use asset_id::AssetId;
pub use async_handle::{Async, AsyncResult};
pub use async_state::AsyncStatus;
pub use error::Status;
pub use events::{AssetNotification, EventBroadcaster, ListenerHandle};
pub use loader::{AssetLoader, LoaderRegistry};
pub use manager::{AssetCallback, AssetManager};
pub use pak::{AssetMeta, AssetPak, FsPak};
pub use task::{Task, TaskContext, TaskHnd};
pub use task_manager::TaskManager;
pub use texture_loader::{DecodedImage, ImageDecoder, TextureImportOptions, TextureLoader};
