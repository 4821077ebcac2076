//! Compiled-program cache keyed by the SHA-256 of the template source.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use sha2::{Digest, Sha256};

use htmlmail_core::{compile, Program, TemplateError};

/// Hex SHA-256 digest of a template source.
pub fn template_hash(source: &str) -> String {
    let mut h = Sha256::new();
    h.update(source.as_bytes());
    hex::encode(h.finalize())
}

/// Thread-safe map from template hash to compiled [`Program`].
#[derive(Debug, Default)]
pub struct ProgramCache {
    programs: Mutex<HashMap<String, Arc<Program>>>,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached program for `source`, compiling it on first use.
    /// Failed compilations are not cached.
    pub fn get_or_compile(&self, source: &str) -> Result<Arc<Program>, TemplateError> {
        let key = template_hash(source);
        if let Some(program) = self.lock().get(&key) {
            tracing::debug!(hash = %key, "program cache hit");
            return Ok(Arc::clone(program));
        }

        // Compile outside the lock; a concurrent miss compiles twice and the
        // second insert wins.
        let program = Arc::new(compile(source)?);
        tracing::debug!(hash = %key, "compiled template");
        self.lock().insert(key, Arc::clone(&program));
        Ok(program)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Program>>> {
        self.programs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
