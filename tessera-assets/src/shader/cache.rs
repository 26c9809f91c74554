//! Content-keyed cache of compiled shader bytecode, two-tiered: a live GPU module kept in
//! memory, and bytecode that can always be resubmitted to the driver to rebuild one. Owned
//! independently of the asset manager's own lock, so a shader build never blocks on an
//! unrelated asset request and vice versa.

use crate::shader::driver::{GpuDriver, ShaderModule};
use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::io::{self, Read, Write};
use std::sync::Arc;

struct Entry {
    name: String,
    module: Option<ShaderModule>,
    bytecode: Option<Vec<u8>>,
}

/// Content-keyed shader bytecode cache. Cheap to clone; clones share the same table and driver.
#[derive(Clone)]
pub struct ShaderCache {
    driver: Arc<dyn GpuDriver>,
    entries: Arc<Mutex<FxHashMap<String, Entry>>>,
}

impl ShaderCache {
    pub fn new(driver: Arc<dyn GpuDriver>) -> Self {
        Self {
            driver,
            entries: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    /// Returns a live module for `key`, materializing one from stored bytecode via the driver
    /// if no module is resident yet. Returns `None` on a cold miss or if rebuilding fails.
    pub fn find(&self, key: &str) -> Option<ShaderModule> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(key)?;
        if let Some(module) = &entry.module {
            return Some(module.clone());
        }
        let bytecode = entry.bytecode.as_ref()?;
        match self.driver.create_module(bytecode) {
            Ok(module) => {
                entry.module = Some(module.clone());
                Some(module)
            }
            Err(_) => None,
        }
    }

    /// Registers a freshly built module under `key`. Bytecode is not extracted here; it's
    /// filled in lazily, at save time.
    pub fn cache(&self, key: impl Into<String>, name: impl Into<String>, module: ShaderModule) {
        self.entries.lock().insert(
            key.into(),
            Entry {
                name: name.into(),
                module: Some(module),
                bytecode: None,
            },
        );
    }

    /// Serializes every entry that can yield bytecode, as a sequence of length-prefixed
    /// `{key, name, bytecode}` records. Entries whose module can't yield bytecode are dropped.
    pub fn save(&self, out: &mut impl Write) -> io::Result<()> {
        let entries = self.entries.lock();
        for (key, entry) in entries.iter() {
            let bytecode = match (&entry.bytecode, &entry.module) {
                (Some(bytes), _) => bytes.clone(),
                (None, Some(module)) => module.bytecode().to_vec(),
                (None, None) => continue,
            };
            write_record(out, key.as_bytes())?;
            write_record(out, entry.name.as_bytes())?;
            write_record(out, &bytecode)?;
        }
        Ok(())
    }

    /// Replaces the in-memory table with the contents of a saved stream. Modules are not
    /// reconstructed until the first `find`.
    pub fn load(&self, input: &mut impl Read) -> io::Result<()> {
        let mut loaded = FxHashMap::default();
        loop {
            let key = match read_record(input) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            };
            let name = read_record(input)?;
            let bytecode = read_record(input)?;
            loaded.insert(
                String::from_utf8_lossy(&key).into_owned(),
                Entry {
                    name: String::from_utf8_lossy(&name).into_owned(),
                    module: None,
                    bytecode: Some(bytecode),
                },
            );
        }
        *self.entries.lock() = loaded;
        Ok(())
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

fn write_record(out: &mut impl Write, bytes: &[u8]) -> io::Result<()> {
    out.write_all(&(bytes.len() as u32).to_le_bytes())?;
    out.write_all(bytes)
}

fn read_record(input: &mut impl Read) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    input.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    input.read_exact(&mut buf)?;
    Ok(buf)
}
