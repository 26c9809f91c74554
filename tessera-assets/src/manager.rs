//! The asset manager: turns a stream of `load_async` calls into a minimal set of loader
//! invocations, with dedup, dependency ordering, a weak-reference cache, and event publishing.
//!
//! Grounded on `fyrox-resource`'s `ResourceContainer::request` for the cache-hit / in-flight /
//! new-request branching, adapted from its time-to-live strong-reference eviction to the
//! weak-reference-plus-explicit-`gc()` model this pipeline requires, and on its
//! `ResourceLoadersContainer`/`ResourceEventBroadcaster` for loader dispatch and notifications.

use crate::asset::{Asset, ClassRegistry, WeakAsset};
use crate::asset_id::AssetId;
use crate::async_handle::{Async, AsyncResult};
use crate::async_state::{AsyncState, AsyncStatus};
use crate::error::Status;
use crate::events::{AssetNotification, EventBroadcaster};
use crate::loader::{AssetLoader, LoaderRegistry};
use crate::pak::{AssetMeta, AssetPak};
use crate::task::Task;
use crate::task_manager::TaskManager;
use fxhash::FxHashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tessera_core::log::Log;

/// A registered completion callback, type-erased the same way the manager's public API
/// erases it: the caller doesn't need to know whether the request resolved from cache, joined
/// an in-flight load, or kicked off a new one.
pub type AssetCallback = Box<dyn FnOnce(AsyncStatus, Option<Asset>) + Send>;

/// Per-in-flight-id bookkeeping. Presence in the manager's `loading` map is the dedup key;
/// the record is removed on the id's terminal transition, success or failure.
struct LoadRecord {
    async_op: AsyncResult<Asset>,
}

struct Inner {
    paks: RwLock<Vec<Arc<dyn AssetPak>>>,
    loaders: LoaderRegistry,
    classes: Arc<ClassRegistry>,
    cache: Mutex<FxHashMap<AssetId, WeakAsset>>,
    loading: Mutex<FxHashMap<AssetId, LoadRecord>>,
    events: EventBroadcaster,
    tasks: TaskManager,
}

/// Single process-wide asset pipeline entry point. Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct AssetManager(Arc<Inner>);

impl AssetManager {
    pub fn new() -> Self {
        Self::with_task_manager(TaskManager::new())
    }

    pub fn with_task_manager(tasks: TaskManager) -> Self {
        Self(Arc::new(Inner {
            paks: RwLock::new(Vec::new()),
            loaders: LoaderRegistry::new(),
            classes: Arc::new(ClassRegistry::new()),
            cache: Mutex::new(FxHashMap::default()),
            loading: Mutex::new(FxHashMap::default()),
            events: EventBroadcaster::new(),
            tasks,
        }))
    }

    pub fn classes(&self) -> &Arc<ClassRegistry> {
        &self.0.classes
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.0.events
    }

    pub fn task_manager(&self) -> &TaskManager {
        &self.0.tasks
    }

    pub fn add_loader(&self, loader: Arc<dyn AssetLoader>) {
        self.0.loaders.add(loader);
    }

    pub fn add_pak(&self, pak: Arc<dyn AssetPak>) {
        self.0.paks.write().push(pak);
    }

    /// Issues or joins a load. `cb`, if given, is registered on the returned state and so is
    /// guaranteed to run exactly once, synchronously if the state is already terminal.
    pub fn load_async(&self, id: AssetId, cb: Option<AssetCallback>) -> AsyncResult<Asset> {
        // 1. Cache hit.
        {
            let cache = self.0.cache.lock();
            if let Some(weak) = cache.get(&id) {
                if let Some(asset) = weak.upgrade() {
                    drop(cache);
                    let result = AsyncResult::ready(asset);
                    if let Some(cb) = cb {
                        result.add_on_completion(cb);
                    }
                    return result;
                }
            }
        }

        // 2. In-flight hit.
        {
            let loading = self.0.loading.lock();
            if let Some(record) = loading.get(&id) {
                let result = record.async_op.clone();
                drop(loading);
                if let Some(cb) = cb {
                    result.add_on_completion(cb);
                }
                return result;
            }
        }

        // 3. Meta miss.
        let meta = match self.resolve_meta(&id) {
            Some(meta) => meta,
            None => {
                Log::warn(format!("no pak could resolve meta for asset {id}"));
                let result = AsyncResult::failed();
                if let Some(cb) = cb {
                    result.add_on_completion(cb);
                }
                return result;
            }
        };

        // 4. New request. Claim the loading slot before recursing into dependencies so a
        // concurrent request for the same id joins this one instead of starting a second.
        let state = Arc::new(AsyncState::<Asset>::new_pending());
        {
            let mut loading = self.0.loading.lock();
            if let Some(record) = loading.get(&id) {
                let result = record.async_op.clone();
                drop(loading);
                if let Some(cb) = cb {
                    result.add_on_completion(cb);
                }
                return result;
            }
            loading.insert(
                id.clone(),
                LoadRecord {
                    async_op: AsyncResult::from_state(state.clone()),
                },
            );
        }

        // Dependencies are resolved with the manager lock released: each recursive call
        // re-enters this same function rather than a held critical section.
        let dep_asyncs: Vec<Async> = meta
            .deps
            .iter()
            .cloned()
            .map(|dep_id| self.load_async(dep_id, None).erase())
            .collect();
        let join = Async::join(&dep_asyncs);

        let manager = self.clone();
        let load_id = id.clone();
        let load_meta = meta.clone();
        let load_state = state.clone();
        let task = Task::new(format!("load:{id}"), move |_ctx| {
            manager.run_load(&load_id, &load_meta, &load_state)
        });

        let task_hnd = self.0.tasks.schedule_after(task, join);

        // The success path is handled synchronously inside `run_load`, on the worker thread.
        // This callback only has to cover the runnable returning non-zero.
        let manager = self.clone();
        let fail_id = id.clone();
        let fail_state = state.clone();
        task_hnd.add_on_completion(move |status, _| {
            if status == AsyncStatus::Failed {
                manager
                    .0
                    .events
                    .broadcast(AssetNotification::FailedLoad { id: fail_id.clone() });
                fail_state.set_failed();
                manager.0.loading.lock().remove(&fail_id);
            }
        });

        let result = AsyncResult::from_state(state);
        if let Some(cb) = cb {
            result.add_on_completion(cb);
        }
        result
    }

    /// Blocking convenience wrapper: issues a load and waits for it to settle.
    pub fn load(&self, id: AssetId) -> Option<Asset> {
        self.load_async(id, None).wait()
    }

    /// Non-blocking cache probe. Upgrades the weak reference if one is present and still live.
    pub fn find(&self, id: &AssetId) -> Option<Asset> {
        self.0.cache.lock().get(id).and_then(|weak| weak.upgrade())
    }

    /// Single-pass eviction of cache entries whose only remaining strong reference would be
    /// the temporary created by this very check. Does not look at `loading`: an asset may
    /// legitimately be present there and absent from `cache` at the same time; the loading
    /// task writes the cache entry itself on success.
    pub fn gc(&self) {
        self.0.cache.lock().retain(|_, weak| match weak.upgrade() {
            Some(asset) => asset.strong_count() > 1,
            None => false,
        });
    }

    /// Drops every weak reference. Does not free assets that are still strongly held
    /// elsewhere; it only forgets the cache's knowledge of them.
    pub fn clear(&self) {
        self.0.cache.lock().clear();
    }

    fn resolve_meta(&self, id: &AssetId) -> Option<AssetMeta> {
        let paks = self.0.paks.read();
        for pak in paks.iter() {
            match pak.get_meta(id, pak) {
                Ok(meta) => return Some(meta),
                Err(Status::NotFound) => continue,
                Err(other) => {
                    Log::warn(format!(
                        "pak {:?} failed to resolve {id}: {other}",
                        pak.name()
                    ));
                    continue;
                }
            }
        }
        None
    }

    /// The task runnable: invokes the bound loader and, on success, performs every step the
    /// spec assigns to the happy path before the task handle itself ever transitions -
    /// stamping the name, publishing `Loaded`, writing the cache entry, and resolving the
    /// per-id state. On failure it only returns non-zero; the caller's completion callback
    /// on the task handle does the rest.
    fn run_load(&self, id: &AssetId, meta: &AssetMeta, state: &Arc<AsyncState<Asset>>) -> i32 {
        let loader = match self.0.loaders.find(&meta.loader) {
            Some(loader) => loader,
            None => {
                Log::err(format!("no loader registered under name {:?}", meta.loader));
                return 1;
            }
        };

        match loader.load(id, meta) {
            Ok(asset) => {
                asset.set_name_if_empty(id);
                self.0.events.broadcast(AssetNotification::Loaded {
                    id: id.clone(),
                    asset: asset.clone(),
                });
                self.0.cache.lock().insert(id.clone(), asset.downgrade());
                state.set_result(asset);
                self.0.loading.lock().remove(id);
                0
            }
            Err(status) => {
                Log::warn(format!("loader {:?} failed for {id}: {status}", meta.loader));
                1
            }
        }
    }
}

impl Default for AssetManager {
    fn default() -> Self {
        Self::new()
    }
}
