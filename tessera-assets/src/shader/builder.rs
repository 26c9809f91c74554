//! Canonical non-trivial loader: resolves includes, builds a deterministic cache key, and
//! either reuses a cached module or compiles fresh ones on the task pool, one sub-task per
//! shader stage, joined before the program asset is assembled.

use crate::asset::{Asset, AssetData, ShaderProgramAsset};
use crate::asset_id::AssetId;
use crate::async_handle::{Async, AsyncResult};
use crate::async_state::AsyncState;
use crate::error::Status;
use crate::loader::AssetLoader;
use crate::pak::AssetMeta;
use crate::shader::cache::ShaderCache;
use crate::shader::driver::GpuDriver;
use crate::shader::include::{resolve_includes, ResolvedInclude, ShaderSourceRoot};
use crate::task::Task;
use crate::task_manager::TaskManager;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One programmable stage of a shader program.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

/// Compiles GLSL source to SPIR-V bytecode for one stage. An external collaborator: the real
/// compiler lives below this boundary, behind whatever toolchain the target platform provides.
pub trait ShaderCompiler: Send + Sync {
    fn compile(&self, stage: ShaderStage, source: &str) -> Result<Vec<u8>, Status>;
}

#[derive(Deserialize)]
struct ShaderImportOptions {
    #[serde(default)]
    class: String,
    /// Stage name ("vertex" / "fragment" / "compute") to virtual source path.
    modules: BTreeMap<String, String>,
    #[serde(default)]
    defines: BTreeMap<String, String>,
    #[serde(default)]
    vertex_attribute_mask: u32,
    #[serde(default)]
    variant_bits: u32,
}

/// The canonical [`AssetLoader`] for compiled shader programs, routed through a [`ShaderCache`].
///
/// `load` blocks its calling worker on [`Async::join`] of its own stage sub-tasks, which it
/// schedules onto `tasks`. Since `load` itself always runs on a worker borrowed from the
/// manager's own pool, `tasks` must be a [`TaskManager`] distinct from (not cloned from) the
/// one driving [`crate::manager::AssetManager`] — otherwise, on a single-worker pool, the
/// worker blocking in `join` is the only thread that could ever run the sub-tasks it is
/// waiting on.
pub struct ShaderProgramBuilder {
    root: Arc<dyn ShaderSourceRoot>,
    compiler: Arc<dyn ShaderCompiler>,
    driver: Arc<dyn GpuDriver>,
    cache: ShaderCache,
    tasks: TaskManager,
}

impl ShaderProgramBuilder {
    /// `tasks` compiles shader stages and must be its own pool, separate from whatever
    /// [`TaskManager`] the owning [`crate::manager::AssetManager`] schedules loads on.
    pub fn new(
        root: Arc<dyn ShaderSourceRoot>,
        compiler: Arc<dyn ShaderCompiler>,
        driver: Arc<dyn GpuDriver>,
        cache: ShaderCache,
        tasks: TaskManager,
    ) -> Self {
        Self {
            root,
            compiler,
            driver,
            cache,
            tasks,
        }
    }
}

impl AssetLoader for ShaderProgramBuilder {
    fn name(&self) -> &str {
        "shader_program"
    }

    fn load(&self, id: &AssetId, meta: &AssetMeta) -> Result<Asset, Status> {
        let options: ShaderImportOptions =
            serde_yaml::from_value(meta.import_options.clone()).map_err(|_| Status::InvalidData)?;

        let mut includes_all = Vec::new();
        let mut sources_by_stage = BTreeMap::new();
        for (stage_name, path) in &options.modules {
            let stage = parse_stage(stage_name)?;
            let source = self.root.read_source(path)?;
            let (expanded, includes) = resolve_includes(self.root.as_ref(), path, &source)?;
            includes_all.extend(includes);
            sources_by_stage.insert(stage, expanded);
        }

        let key = build_cache_key(&options, &includes_all);

        if let Some(module) = self.cache.find(&key) {
            return Ok(Asset::new(
                id.clone(),
                meta.cls.clone(),
                AssetData::ShaderProgram(ShaderProgramAsset { cache_key: key, module }),
            ));
        }

        // One sub-task per stage, joined before any module is created: a module for stage A
        // is never built while stage B is still compiling on another worker.
        let mut per_stage = Vec::new();
        for (stage, source) in sources_by_stage {
            let compiler = self.compiler.clone();
            let state = Arc::new(AsyncState::<Vec<u8>>::new_pending());
            let handle = AsyncResult::from_state(state.clone());
            let task = Task::new(format!("compile:{id}:{stage:?}"), move |_ctx| {
                match compiler.compile(stage, &source) {
                    Ok(bytecode) => {
                        state.set_result(bytecode);
                        0
                    }
                    Err(_) => {
                        state.set_failed();
                        1
                    }
                }
            });
            self.tasks.schedule(task);
            per_stage.push((stage, handle));
        }

        let joined = Async::join(
            &per_stage
                .iter()
                .map(|(_, handle)| handle.erase())
                .collect::<Vec<_>>(),
        );
        joined.wait_completed();

        let mut bytecode_by_stage = BTreeMap::new();
        for (stage, handle) in &per_stage {
            match handle.result() {
                Some(bytecode) => {
                    bytecode_by_stage.insert(*stage, bytecode);
                }
                None => return Err(Status::FailedCompile),
            }
        }

        let combined = combine_stage_bytecode(&bytecode_by_stage);
        let module = self
            .driver
            .create_module(&combined)
            .map_err(|_| Status::FailedCompile)?;
        self.cache.cache(key.clone(), id.to_string(), module.clone());

        Ok(Asset::new(
            id.clone(),
            meta.cls.clone(),
            AssetData::ShaderProgram(ShaderProgramAsset { cache_key: key, module }),
        ))
    }
}

fn parse_stage(name: &str) -> Result<ShaderStage, Status> {
    match name {
        "vertex" => Ok(ShaderStage::Vertex),
        "fragment" => Ok(ShaderStage::Fragment),
        "compute" => Ok(ShaderStage::Compute),
        _ => Err(Status::InvalidData),
    }
}

/// Packs every stage's bytecode into one blob, ordered by stage so the result is deterministic
/// regardless of compile completion order.
fn combine_stage_bytecode(bytecode_by_stage: &BTreeMap<ShaderStage, Vec<u8>>) -> Vec<u8> {
    let mut combined = Vec::new();
    for (stage, bytecode) in bytecode_by_stage {
        combined.extend_from_slice(&(*stage as u32).to_le_bytes());
        combined.extend_from_slice(&(bytecode.len() as u32).to_le_bytes());
        combined.extend_from_slice(bytecode);
    }
    combined
}

/// Builds the cache key from class name, module set, include set (names and content hashes),
/// defines (sorted by name), vertex attribute mask, and variant bits.
fn build_cache_key(options: &ShaderImportOptions, includes: &[ResolvedInclude]) -> String {
    let mut key_input = String::new();
    key_input.push_str(&options.class);
    key_input.push('|');
    for (stage, path) in &options.modules {
        key_input.push_str(stage);
        key_input.push(':');
        key_input.push_str(path);
        key_input.push(',');
    }

    key_input.push('|');
    let mut sorted_includes = includes.to_vec();
    sorted_includes.sort_by(|a, b| a.path.cmp(&b.path));
    for include in &sorted_includes {
        let hash = fxhash::hash(&include.content);
        key_input.push_str(&format!("{}:{hash:x},", include.path));
    }

    key_input.push('|');
    for (name, value) in &options.defines {
        key_input.push_str(&format!("{name}={value},"));
    }

    key_input.push_str(&format!(
        "|vam={:x}|variant={:x}",
        options.vertex_attribute_mask, options.variant_bits
    ));

    format!("{:016x}", fxhash::hash(&key_input))
}
