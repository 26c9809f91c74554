//! Stand-in for the GPU driver boundary beneath shader modules. Device/queue/descriptor
//! machinery lives below this line and is out of scope; this models only the
//! bytecode-in/module-out contract the cache and builder actually depend on.

use crate::error::Status;
use std::sync::Arc;

struct ShaderModuleInner {
    bytecode: Vec<u8>,
}

/// Opaque GPU-resident shader module. Cheap to clone; clones name the same underlying handle.
#[derive(Clone)]
pub struct ShaderModule(Arc<ShaderModuleInner>);

impl ShaderModule {
    pub fn bytecode(&self) -> &[u8] {
        &self.0.bytecode
    }

    pub fn bytecode_hash(&self) -> u64 {
        fxhash::hash(&self.0.bytecode)
    }
}

/// External collaborator: turns SPIR-V bytecode into a resident module. The real
/// implementation lives below the device/queue boundary.
pub trait GpuDriver: Send + Sync {
    fn create_module(&self, bytecode: &[u8]) -> Result<ShaderModule, Status>;
}

/// Driver that treats the bytecode itself as the module's identity. Lets the cache and
/// builder be exercised without a real graphics backend.
#[derive(Default)]
pub struct StubDriver;

impl GpuDriver for StubDriver {
    fn create_module(&self, bytecode: &[u8]) -> Result<ShaderModule, Status> {
        Ok(ShaderModule(Arc::new(ShaderModuleInner {
            bytecode: bytecode.to_vec(),
        })))
    }
}
