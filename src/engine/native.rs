//! Local-model backend bound to a native inference runtime.
//!
//! The runtime (a llama.cpp-style bridge) is loaded once at construction; a
//! load failure is logged and leaves the backend permanently not ready for
//! this process lifetime. `ensure_available` locates the model file under the
//! asset store's `models/default/` convention and flips ready only when the
//! runtime confirms initialization. Native resources are released through an
//! explicit [`NativeModelEngine::teardown`], never via finalization.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::{error, warn};
use parking_lot::Mutex;

use super::{EngineError, GenParams, LocalModelEngine, TokenSink};
use crate::assets::AssetStore;

const DEFAULT_MODEL_ID: &str = "default";
const DEFAULT_MODEL_FILE: &str = "model.gguf";

/// Boundary to the native inference library.
#[async_trait]
pub trait NativeRuntime: Send + Sync {
    /// Load model weights; `Ok` means the runtime is generation-capable.
    fn init(&self, model_path: &Path) -> Result<()>;

    /// Produce fragments for `prompt`, pushing each into `on_token` in order.
    /// An error mid-stream leaves already-pushed fragments delivered.
    async fn generate(
        &self,
        prompt: &str,
        params: GenParams,
        on_token: &mut TokenSink<'_>,
    ) -> Result<()>;

    /// Release model state. Idempotent.
    fn teardown(&self);
}

pub struct NativeModelEngine {
    runtime: Option<Arc<dyn NativeRuntime>>,
    store: Arc<AssetStore>,
    ready: AtomicBool,
    model_path: Mutex<Option<PathBuf>>,
}

impl NativeModelEngine {
    /// `loader` stands in for loading the native shared library; its failure
    /// is caught here and makes the engine permanently not ready.
    pub fn new(
        store: Arc<AssetStore>,
        loader: impl FnOnce() -> Result<Arc<dyn NativeRuntime>>,
    ) -> Self {
        let runtime = match loader() {
            Ok(runtime) => Some(runtime),
            Err(err) => {
                error!("unable to load native inference runtime: {err:?}");
                None
            }
        };
        Self {
            runtime,
            store,
            ready: AtomicBool::new(false),
            model_path: Mutex::new(None),
        }
    }

    /// Explicit release of native model state.
    pub fn teardown(&self) {
        if let Some(runtime) = &self.runtime {
            runtime.teardown();
        }
        self.ready.store(false, Ordering::Release);
        *self.model_path.lock() = None;
    }
}

#[async_trait]
impl LocalModelEngine for NativeModelEngine {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn ensure_available(&self, on_progress: &(dyn Fn(u8) + Send + Sync)) {
        on_progress(0);
        let Some(runtime) = &self.runtime else {
            return;
        };

        let model = match self.store.resolve_path("models", DEFAULT_MODEL_ID) {
            Ok(dir) => dir.join(DEFAULT_MODEL_FILE),
            Err(err) => {
                warn!("model directory unavailable: {err}");
                self.ready.store(false, Ordering::Release);
                return;
            }
        };
        if !model.exists() {
            warn!("no model installed at {}", model.display());
            self.ready.store(false, Ordering::Release);
            return;
        }

        match runtime.init(&model) {
            Ok(()) => {
                *self.model_path.lock() = Some(model);
                self.ready.store(true, Ordering::Release);
                on_progress(100);
            }
            Err(err) => {
                error!("native model initialization failed: {err:?}");
                self.ready.store(false, Ordering::Release);
            }
        }
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        params: GenParams,
        on_token: &mut TokenSink<'_>,
    ) -> Result<String, EngineError> {
        if !self.is_ready() {
            return Err(EngineError::NotReady);
        }
        let runtime = self.runtime.as_ref().ok_or(EngineError::NotReady)?;

        let mut accumulated = String::new();
        {
            let mut sink = |token: &str| {
                accumulated.push_str(token);
                on_token(token);
            };
            runtime
                .generate(prompt, params, &mut sink)
                .await
                .map_err(|err| EngineError::Backend(err.to_string()))?;
        }
        Ok(accumulated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, bail};
    use std::sync::atomic::AtomicUsize;
    use uuid::Uuid;

    fn scratch_store() -> Arc<AssetStore> {
        let root = std::env::temp_dir().join(format!("screentalk-native-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&root).unwrap();
        Arc::new(AssetStore::new(root))
    }

    struct ScriptedRuntime {
        fragments: Vec<String>,
        fail_after: Option<usize>,
        torn_down: AtomicBool,
    }

    impl ScriptedRuntime {
        fn streaming(fragments: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                fragments: fragments.iter().map(|s| s.to_string()).collect(),
                fail_after: None,
                torn_down: AtomicBool::new(false),
            })
        }

        fn failing_after(fragments: &[&str], after: usize) -> Arc<Self> {
            Arc::new(Self {
                fragments: fragments.iter().map(|s| s.to_string()).collect(),
                fail_after: Some(after),
                torn_down: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl NativeRuntime for ScriptedRuntime {
        fn init(&self, _model_path: &Path) -> Result<()> {
            Ok(())
        }

        async fn generate(
            &self,
            _prompt: &str,
            _params: GenParams,
            on_token: &mut TokenSink<'_>,
        ) -> Result<()> {
            for (index, fragment) in self.fragments.iter().enumerate() {
                if self.fail_after == Some(index) {
                    bail!("native backend crashed mid-stream");
                }
                on_token(fragment);
            }
            Ok(())
        }

        fn teardown(&self) {
            self.torn_down.store(true, Ordering::SeqCst);
        }
    }

    fn install_default_model(store: &AssetStore) {
        let dir = store.resolve_path("models", DEFAULT_MODEL_ID).unwrap();
        std::fs::write(dir.join(DEFAULT_MODEL_FILE), b"weights").unwrap();
    }

    #[tokio::test]
    async fn not_ready_stream_returns_error_and_no_tokens() {
        let store = scratch_store();
        let runtime: Arc<dyn NativeRuntime> = ScriptedRuntime::streaming(&["never"]);
        let engine = NativeModelEngine::new(store, || Ok(runtime));

        let calls = AtomicUsize::new(0);
        let result = engine
            .generate_stream("hi", GenParams::default(), &mut |_t: &str| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert!(matches!(result, Err(EngineError::NotReady)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_loader_leaves_engine_permanently_not_ready() {
        let store = scratch_store();
        install_default_model(&store);
        let engine = NativeModelEngine::new(store, || Err(anyhow!("dlopen failed")));

        let progress = Mutex::new(Vec::new());
        engine
            .ensure_available(&|percent| progress.lock().push(percent))
            .await;

        assert!(!engine.is_ready());
        assert_eq!(*progress.lock(), vec![0]);
    }

    #[tokio::test]
    async fn missing_model_file_keeps_ready_false() {
        let store = scratch_store();
        let runtime: Arc<dyn NativeRuntime> = ScriptedRuntime::streaming(&["x"]);
        let engine = NativeModelEngine::new(store, || Ok(runtime));
        engine.ensure_available(&|_percent| {}).await;
        assert!(!engine.is_ready());
    }

    #[tokio::test]
    async fn streams_fragments_in_order_and_returns_concatenation() {
        let store = scratch_store();
        install_default_model(&store);
        let runtime: Arc<dyn NativeRuntime> =
            ScriptedRuntime::streaming(&["The ", "screen ", "shows ", "Settings."]);
        let engine = NativeModelEngine::new(store, || Ok(runtime));

        let progress = Mutex::new(Vec::new());
        engine
            .ensure_available(&|percent| progress.lock().push(percent))
            .await;
        assert!(engine.is_ready());
        assert_eq!(*progress.lock(), vec![0, 100]);

        let mut seen = Vec::new();
        let full = engine
            .generate_stream("what is on screen?", GenParams::default(), &mut |t: &str| {
                seen.push(t.to_string())
            })
            .await
            .unwrap();
        assert_eq!(full, "The screen shows Settings.");
        assert_eq!(seen.len(), 4);
    }

    #[tokio::test]
    async fn midstream_failure_keeps_delivered_tokens() {
        let store = scratch_store();
        install_default_model(&store);
        let runtime: Arc<dyn NativeRuntime> =
            ScriptedRuntime::failing_after(&["partial ", "answer ", "never"], 2);
        let engine = NativeModelEngine::new(store, || Ok(runtime));
        engine.ensure_available(&|_percent| {}).await;

        let mut seen = String::new();
        let result = engine
            .generate_stream("q", GenParams::default(), &mut |t: &str| seen.push_str(t))
            .await;

        assert!(matches!(result, Err(EngineError::Backend(_))));
        assert_eq!(seen, "partial answer ");
    }

    #[tokio::test]
    async fn teardown_releases_runtime_and_clears_ready() {
        let store = scratch_store();
        install_default_model(&store);
        let runtime = ScriptedRuntime::streaming(&["x"]);
        let loaded: Arc<dyn NativeRuntime> = runtime.clone();
        let engine = NativeModelEngine::new(store, move || Ok(loaded));
        engine.ensure_available(&|_percent| {}).await;
        assert!(engine.is_ready());

        engine.teardown();
        assert!(!engine.is_ready());
        assert!(runtime.torn_down.load(Ordering::SeqCst));
    }
}
