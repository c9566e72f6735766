//! Per-run shared state.

use super::{OutputStore, SecretBag};
use crate::cancellation::CancellationToken;
use crate::core::StringMap;
use crate::errors::DataConflictError;
use crate::secrets::SecretMasker;
use crate::writer::{MaskedWriter, NoOpWriter, Writer};
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// The mutable state shared by every unit in one run.
///
/// Created once per run request and shared behind an `Arc`. Secrets and
/// outputs are append-only; unit-level environment overrides never touch the
/// run environment.
pub struct RunContext {
    run_id: Uuid,
    env: RwLock<StringMap>,
    secrets: SecretBag,
    outputs: OutputStore,
    args: Vec<String>,
    cancel: Arc<CancellationToken>,
    masker: Arc<SecretMasker>,
    sink: Arc<dyn Writer>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    /// Creates an empty run context with a fresh run id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: crate::utils::generate_run_id(),
            env: RwLock::new(StringMap::new()),
            secrets: SecretBag::new(),
            outputs: OutputStore::new(),
            args: Vec::new(),
            cancel: Arc::new(CancellationToken::new()),
            masker: Arc::new(SecretMasker::new()),
            sink: Arc::new(NoOpWriter),
        }
    }

    /// Seeds the environment from the current process environment.
    #[must_use]
    pub fn with_process_env(self) -> Self {
        self.env.write().extend(std::env::vars());
        self
    }

    /// Sets an environment variable.
    #[must_use]
    pub fn with_env(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.write().insert(key, value);
        self
    }

    /// Merges an environment map over the current environment.
    #[must_use]
    pub fn with_env_map(self, env: &StringMap) -> Self {
        self.env.write().merge(env);
        self
    }

    /// Sets the raw invocation arguments.
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a resolved secret. Conflicting values are logged and ignored.
    #[must_use]
    pub fn with_secret(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Err(e) = self.add_secret(key, value) {
            tracing::warn!(key = %e.key, "Ignoring conflicting secret value");
        }
        self
    }

    /// Replaces the masker, feeding it every secret already known.
    #[must_use]
    pub fn with_masker(mut self, masker: Arc<SecretMasker>) -> Self {
        for (_, value) in self.secrets.snapshot().iter() {
            masker.add(value);
        }
        self.masker = masker;
        self
    }

    /// Sets the observability sink. Output is always masked.
    #[must_use]
    pub fn with_writer(mut self, writer: Arc<dyn Writer>) -> Self {
        self.sink = writer;
        self
    }

    /// Uses an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancel = token;
        self
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns a copy of the run environment.
    #[must_use]
    pub fn env(&self) -> StringMap {
        self.env.read().clone()
    }

    /// Gets an environment variable.
    #[must_use]
    pub fn env_var(&self, key: &str) -> Option<String> {
        self.env.read().get(key).map(ToString::to_string)
    }

    /// Sets a run-wide environment variable.
    pub fn set_env(&self, key: impl Into<String>, value: impl Into<String>) {
        self.env.write().insert(key, value);
    }

    /// Adds a secret and registers its value with the masker.
    ///
    /// # Errors
    ///
    /// Returns `DataConflictError` if the key already holds a different value.
    pub fn add_secret(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DataConflictError> {
        let value = value.into();
        self.secrets.set(key, value.clone())?;
        self.masker.add(value);
        Ok(())
    }

    /// Gets a secret value.
    #[must_use]
    pub fn secret(&self, key: &str) -> Option<String> {
        self.secrets.get(key)
    }

    /// Returns the secret bag.
    #[must_use]
    pub fn secrets(&self) -> &SecretBag {
        &self.secrets
    }

    /// Returns the outputs recorded so far.
    #[must_use]
    pub fn outputs(&self) -> &OutputStore {
        &self.outputs
    }

    /// Returns the raw invocation arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the run's cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &Arc<CancellationToken> {
        &self.cancel
    }

    /// Requests cancellation of the run.
    pub fn cancel(&self, reason: impl Into<String>) {
        self.cancel.cancel(reason);
    }

    /// Returns whether the run was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns the secret masker.
    #[must_use]
    pub fn masker(&self) -> &Arc<SecretMasker> {
        &self.masker
    }

    /// Masks secrets in `text`.
    #[must_use]
    pub fn mask(&self, text: &str) -> String {
        self.masker.mask(text)
    }

    /// Returns a writer that masks before forwarding to the sink.
    #[must_use]
    pub fn writer(&self) -> MaskedWriter {
        MaskedWriter::new(self.sink.clone(), self.masker.clone())
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("env_count", &self.env.read().len())
            .field("secret_keys", &self.secrets.keys())
            .field("outputs", &self.outputs.units())
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::MASK;
    use crate::writer::CollectingWriter;

    #[test]
    fn test_secrets_feed_masker() {
        let sink = Arc::new(CollectingWriter::new());
        let ctx = RunContext::new()
            .with_writer(sink.clone())
            .with_secret("DB_PASSWORD", "pa55word");

        ctx.writer().info("connecting with pa55word");

        assert!(sink.contains(&format!("connecting with {MASK}")));
        assert_eq!(ctx.secret("DB_PASSWORD").as_deref(), Some("pa55word"));
    }

    #[test]
    fn test_secret_conflict_rejected() {
        let ctx = RunContext::new().with_secret("TOKEN", "a");
        assert!(ctx.add_secret("TOKEN", "b").is_err());
        assert_eq!(ctx.secret("TOKEN").as_deref(), Some("a"));
    }

    #[test]
    fn test_with_masker_receives_existing_secrets() {
        let masker = Arc::new(SecretMasker::new());
        let ctx = RunContext::new()
            .with_secret("K", "value-1")
            .with_masker(masker.clone());

        assert_eq!(masker.mask("value-1"), MASK);
        assert_eq!(ctx.mask("value-1"), MASK);
    }

    #[test]
    fn test_env_and_args() {
        let ctx = RunContext::new()
            .with_env("STAGE", "dev")
            .with_args(["deploy", "--force"]);
        ctx.set_env("REGION", "eu");

        assert_eq!(ctx.env_var("STAGE").as_deref(), Some("dev"));
        assert_eq!(ctx.env().keys().collect::<Vec<_>>(), vec!["STAGE", "REGION"]);
        assert_eq!(ctx.args(), ["deploy".to_string(), "--force".to_string()]);
    }

    #[test]
    fn test_cancel() {
        let ctx = RunContext::new();
        assert!(!ctx.is_cancelled());

        ctx.cancel("interrupted");
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.cancellation().reason().as_deref(), Some("interrupted"));
    }
}
