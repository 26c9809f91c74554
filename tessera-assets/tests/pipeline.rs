//! End-to-end coverage of the request flow through a real `AssetManager`, a real `FsPak`, and
//! the real worker pool: dedup, dependency ordering, dependency failure propagation, GC, and a
//! shader cache save/reload round trip.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tessera_assets::shader::builder::{ShaderCompiler, ShaderProgramBuilder, ShaderStage};
use tessera_assets::shader::cache::ShaderCache;
use tessera_assets::shader::driver::StubDriver;
use tessera_assets::shader::include::ShaderSourceRoot;
use tessera_assets::{Asset, AssetData, AssetId, AssetLoader, AssetManager, AssetMeta, Status};

fn write_descriptor(dir: &std::path::Path, id: &str, yaml: &str) {
    std::fs::write(dir.join(format!("{id}.yaml")), yaml).unwrap();
}

struct TimestampLoader {
    order: Arc<Mutex<Vec<String>>>,
}

impl AssetLoader for TimestampLoader {
    fn name(&self) -> &str {
        "timestamp"
    }

    fn load(&self, id: &AssetId, _meta: &AssetMeta) -> Result<Asset, Status> {
        std::thread::sleep(Duration::from_millis(5));
        self.order.lock().unwrap().push(id.to_string());
        Ok(Asset::new(
            id.clone(),
            tessera_assets::ClassRegistry::new().find_class("scene").unwrap(),
            AssetData::Scene(tessera_assets::asset::SceneAsset {
                root_name: id.to_string(),
            }),
        ))
    }
}

/// S1: a simple load with no dependencies resolves and lands in the cache.
#[test]
fn simple_load_resolves_and_caches() {
    let dir = tempfile::tempdir().unwrap();
    write_descriptor(dir.path(), "leaf", "class: scene\nloader: timestamp\ndeps: []\n");

    let manager = AssetManager::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    manager.add_loader(Arc::new(TimestampLoader { order }));
    manager.add_pak(Arc::new(tessera_assets::FsPak::new(
        "main",
        dir.path().to_path_buf(),
        manager.classes().clone(),
    )));

    let asset = manager.load(AssetId::new("leaf")).expect("load succeeds");
    assert_eq!(asset.name().as_str(), "leaf");
    assert!(manager.find(&AssetId::new("leaf")).is_some());
}

/// S2: sixteen concurrent requests for the same id dedup to exactly one loader invocation.
#[test]
fn sixteen_concurrent_requests_dedup_to_one_load() {
    let dir = tempfile::tempdir().unwrap();
    write_descriptor(dir.path(), "shared", "class: scene\nloader: timestamp\ndeps: []\n");

    let manager = AssetManager::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    manager.add_loader(Arc::new(TimestampLoader { order: order.clone() }));
    manager.add_pak(Arc::new(tessera_assets::FsPak::new(
        "main",
        dir.path().to_path_buf(),
        manager.classes().clone(),
    )));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let manager = manager.clone();
            std::thread::spawn(move || manager.load(AssetId::new("shared")))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(results.iter().all(Option::is_some));
    assert_eq!(order.lock().unwrap().len(), 1, "loader ran more than once");
}

/// S3: a dependency finishes loading (and is observed in load order) before its dependent.
#[test]
fn dependency_loads_before_dependent() {
    let dir = tempfile::tempdir().unwrap();
    write_descriptor(dir.path(), "base", "class: scene\nloader: timestamp\ndeps: []\n");
    write_descriptor(
        dir.path(),
        "derived",
        "class: scene\nloader: timestamp\ndeps: [base]\n",
    );

    let manager = AssetManager::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    manager.add_loader(Arc::new(TimestampLoader { order: order.clone() }));
    manager.add_pak(Arc::new(tessera_assets::FsPak::new(
        "main",
        dir.path().to_path_buf(),
        manager.classes().clone(),
    )));

    let asset = manager.load(AssetId::new("derived")).expect("load succeeds");
    assert_eq!(asset.name().as_str(), "derived");

    let order = order.lock().unwrap();
    let base_pos = order.iter().position(|n| n == "base").expect("base ran");
    let derived_pos = order.iter().position(|n| n == "derived").expect("derived ran");
    assert!(base_pos < derived_pos, "dependency must load before dependent");
}

struct AlwaysFailLoader;
impl AssetLoader for AlwaysFailLoader {
    fn name(&self) -> &str {
        "always_fail"
    }
    fn load(&self, _id: &AssetId, _meta: &AssetMeta) -> Result<Asset, Status> {
        Err(Status::FailedRead)
    }
}

/// S4: a failing dependency prevents the dependent's loader from ever running.
#[test]
fn failing_dependency_short_circuits_the_dependent() {
    let dir = tempfile::tempdir().unwrap();
    write_descriptor(dir.path(), "broken", "class: scene\nloader: always_fail\ndeps: []\n");
    write_descriptor(
        dir.path(),
        "depends_on_broken",
        "class: scene\nloader: timestamp\ndeps: [broken]\n",
    );

    let manager = AssetManager::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    manager.add_loader(Arc::new(TimestampLoader { order: order.clone() }));
    manager.add_loader(Arc::new(AlwaysFailLoader));
    manager.add_pak(Arc::new(tessera_assets::FsPak::new(
        "main",
        dir.path().to_path_buf(),
        manager.classes().clone(),
    )));

    let result = manager.load(AssetId::new("depends_on_broken"));
    assert!(result.is_none(), "dependent must not resolve when its dependency fails");
    assert!(
        order.lock().unwrap().is_empty(),
        "the dependent's loader must never have run"
    );
}

struct SceneLoader;
impl AssetLoader for SceneLoader {
    fn name(&self) -> &str {
        "scene"
    }
    fn load(&self, id: &AssetId, _meta: &AssetMeta) -> Result<Asset, Status> {
        Ok(Asset::new(
            id.clone(),
            tessera_assets::ClassRegistry::new().find_class("scene").unwrap(),
            AssetData::Scene(tessera_assets::asset::SceneAsset {
                root_name: id.to_string(),
            }),
        ))
    }
}

/// S5: once every strong reference to an asset is dropped, `gc()` evicts it from the cache.
#[test]
fn gc_evicts_once_no_strong_refs_remain() {
    let dir = tempfile::tempdir().unwrap();
    write_descriptor(dir.path(), "ephemeral", "class: scene\nloader: scene\ndeps: []\n");

    let manager = AssetManager::new();
    manager.add_loader(Arc::new(SceneLoader));
    manager.add_pak(Arc::new(tessera_assets::FsPak::new(
        "main",
        dir.path().to_path_buf(),
        manager.classes().clone(),
    )));

    let asset = manager.load(AssetId::new("ephemeral")).unwrap();
    assert!(manager.find(&AssetId::new("ephemeral")).is_some());

    drop(asset);
    manager.gc();
    assert!(manager.find(&AssetId::new("ephemeral")).is_none());
}

struct TableRoot(std::collections::HashMap<&'static str, &'static str>);
impl ShaderSourceRoot for TableRoot {
    fn read_source(&self, path: &str) -> Result<String, Status> {
        self.0.get(path).map(|s| s.to_string()).ok_or(Status::NotFound)
    }
}

struct EchoCompiler {
    calls: Arc<AtomicUsize>,
}
impl ShaderCompiler for EchoCompiler {
    fn compile(&self, stage: ShaderStage, source: &str) -> Result<Vec<u8>, Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{stage:?}:{source}").into_bytes())
    }
}

/// S6: a shader program is compiled once, the cache is saved and reloaded into a fresh
/// instance, and the second builder serves the same module from disk without recompiling.
#[test]
fn shader_cache_survives_a_save_and_reload_round_trip() {
    let root = Arc::new(TableRoot(std::collections::HashMap::from([
        ("vs.glsl", "vertex body"),
        ("fs.glsl", "fragment body"),
    ])));
    let calls = Arc::new(AtomicUsize::new(0));
    let compiler = Arc::new(EchoCompiler { calls: calls.clone() });
    let driver = Arc::new(StubDriver);
    let cache = ShaderCache::new(driver.clone());
    let tasks = tessera_assets::TaskManager::new();

    let builder = ShaderProgramBuilder::new(root.clone(), compiler.clone(), driver.clone(), cache.clone(), tasks.clone());

    let import_options: serde_yaml::Value =
        serde_yaml::from_str("modules:\n  vertex: vs.glsl\n  fragment: fs.glsl\n").unwrap();
    let classes = tessera_assets::ClassRegistry::new();
    struct NullPak;
    impl tessera_assets::AssetPak for NullPak {
        fn name(&self) -> &str {
            "null"
        }
        fn get_meta(
            &self,
            _id: &AssetId,
            _self_arc: &Arc<dyn tessera_assets::AssetPak>,
        ) -> Result<AssetMeta, Status> {
            unreachable!()
        }
        fn read_bytes(&self, _rel_path: &str) -> Result<Vec<u8>, Status> {
            Err(Status::NotFound)
        }
    }
    let meta = AssetMeta {
        cls: classes.find_class("shader_program").unwrap(),
        loader: "shader_program".into(),
        pak: Arc::new(NullPak),
        deps: vec![],
        import_options,
    };

    let first = builder.load(&AssetId::new("prog"), &meta).unwrap();
    let first_key = match first.data() {
        AssetData::ShaderProgram(program) => program.cache_key.clone(),
        _ => panic!("expected a shader program"),
    };
    assert_eq!(calls.load(Ordering::SeqCst), 2, "one compile per stage");

    let mut saved = Vec::new();
    cache.save(&mut saved).unwrap();

    let fresh_cache = ShaderCache::new(driver.clone());
    fresh_cache.load(&mut saved.as_slice()).unwrap();
    let fresh_builder =
        ShaderProgramBuilder::new(root, compiler, driver, fresh_cache, tasks);

    let second = fresh_builder.load(&AssetId::new("prog"), &meta).unwrap();
    let second_key = match second.data() {
        AssetData::ShaderProgram(program) => program.cache_key.clone(),
        _ => panic!("expected a shader program"),
    };

    assert_eq!(first_key, second_key, "cache key is deterministic across instances");
    assert_eq!(calls.load(Ordering::SeqCst), 2, "reload must not recompile");
}

/// A dependency chain resolves in well under a second even with several hops, guarding
/// against a regression that would serialize loads onto the submitter's thread.
#[test]
fn dependency_chain_resolves_promptly() {
    let dir = tempfile::tempdir().unwrap();
    write_descriptor(dir.path(), "a", "class: scene\nloader: timestamp\ndeps: []\n");
    write_descriptor(dir.path(), "b", "class: scene\nloader: timestamp\ndeps: [a]\n");
    write_descriptor(dir.path(), "c", "class: scene\nloader: timestamp\ndeps: [b]\n");

    let manager = AssetManager::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    manager.add_loader(Arc::new(TimestampLoader { order }));
    manager.add_pak(Arc::new(tessera_assets::FsPak::new(
        "main",
        dir.path().to_path_buf(),
        manager.classes().clone(),
    )));

    let start = Instant::now();
    let asset = manager.load(AssetId::new("c"));
    assert!(asset.is_some());
    assert!(start.elapsed() < Duration::from_secs(2));
}
