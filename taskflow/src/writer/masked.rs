//! Writer wrapper that masks secrets.

use super::Writer;
use crate::secrets::SecretMasker;
use std::sync::Arc;

/// Masks every string before forwarding it to the inner writer.
#[derive(Clone)]
pub struct MaskedWriter {
    inner: Arc<dyn Writer>,
    masker: Arc<SecretMasker>,
}

impl MaskedWriter {
    /// Wraps `inner` with `masker`.
    #[must_use]
    pub fn new(inner: Arc<dyn Writer>, masker: Arc<SecretMasker>) -> Self {
        Self { inner, masker }
    }

    /// Returns the masker.
    #[must_use]
    pub fn masker(&self) -> &Arc<SecretMasker> {
        &self.masker
    }
}

impl std::fmt::Debug for MaskedWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskedWriter")
            .field("masker", &self.masker)
            .finish_non_exhaustive()
    }
}

impl Writer for MaskedWriter {
    fn trace(&self, message: &str) {
        self.inner.trace(&self.masker.mask(message));
    }

    fn debug(&self, message: &str) {
        self.inner.debug(&self.masker.mask(message));
    }

    fn info(&self, message: &str) {
        self.inner.info(&self.masker.mask(message));
    }

    fn warn(&self, message: &str) {
        self.inner.warn(&self.masker.mask(message));
    }

    fn error(&self, message: &str) {
        self.inner.error(&self.masker.mask(message));
    }

    fn success(&self, message: &str) {
        self.inner.success(&self.masker.mask(message));
    }

    fn start_group(&self, name: &str) {
        self.inner.start_group(&self.masker.mask(name));
    }

    fn end_group(&self) {
        self.inner.end_group();
    }

    fn command(&self, name: &str, args: &[String]) {
        let args: Vec<String> = args.iter().map(|a| self.masker.mask(a)).collect();
        self.inner.command(&self.masker.mask(name), &args);
    }

    fn progress(&self, name: &str, percent: u8) {
        self.inner.progress(&self.masker.mask(name), percent);
    }
}
