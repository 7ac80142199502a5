//! Layered configuration store and compiler.
//!
//! The store owns the four layers and the compiled ("applied") snapshot.
//! Every mutation recompiles from scratch while holding the layer lock, then
//! swaps the applied snapshot in one step so readers see either the old or
//! the new configuration, never a mix.

use super::layer::{Layer, Layers};
use super::registry::SectionRegistry;
use super::section::{KindNature, Section};
use super::snapshot::Snapshot;
use crate::checker::{ConfigChecker, IssueCollector};
use crate::codec::{self, Callable, CallableRegistry, SerializerFormat};
use crate::error::{ConfigError, Result};
use crate::template::{EnvSource, ProcessEnv};
use crate::types::AttrMap;
use arc_swap::ArcSwap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Environment variable naming the environment-file layer.
pub const CONFIG_PATH_ENV: &str = "LAYERCONF_CONFIG_PATH";

struct StoreState {
    layers: Layers,
    registry: SectionRegistry,
    callables: CallableRegistry,
}

/// Handle to a layered configuration. Clones share the same state.
#[derive(Clone)]
pub struct ConfigStore {
    state: Arc<Mutex<StoreState>>,
    applied: Arc<ArcSwap<Snapshot>>,
    blocked: Arc<AtomicBool>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("applied", &self.applied.load_full())
            .field("blocked", &self.is_update_blocked())
            .finish()
    }
}

impl ConfigStore {
    /// Store with the global-app defaults and the built-in kinds registered.
    pub fn new() -> Self {
        Self::with_defaults(crate::sections::builtin_defaults())
    }

    /// Store with only the global-app defaults.
    pub fn bare() -> Self {
        Self::with_defaults(vec![crate::sections::global_app::default_section()])
    }

    fn with_defaults(defaults: Vec<Section>) -> Self {
        let mut registry = SectionRegistry::new();
        let mut layers = Layers::default();
        for section in defaults {
            if !section.is_global() {
                // built-in kinds never conflict with an empty registry
                let _ = registry.register(section.kind(), section.nature());
            }
            layers.baseline.widen(section);
        }
        let applied = layers.compile();
        Self {
            state: Arc::new(Mutex::new(StoreState {
                layers,
                registry,
                callables: CallableRegistry::new(),
            })),
            applied: Arc::new(ArcSwap::from_pointee(applied)),
            blocked: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Built-in store, plus the environment-file layer named by
    /// `LAYERCONF_CONFIG_PATH` when it is set.
    pub fn from_env() -> Result<Self> {
        let store = Self::new();
        store.load_env_from_var()?;
        Ok(store)
    }

    /// Load the environment-file layer named by `LAYERCONF_CONFIG_PATH`.
    /// Returns whether the variable was set.
    pub fn load_env_from_var(&self) -> Result<bool> {
        self.load_env_from(&ProcessEnv)
    }

    /// [`ConfigStore::load_env_from_var`] reading variables from `env`.
    pub fn load_env_from(&self, env: &impl EnvSource) -> Result<bool> {
        let Some(path) = env.var(CONFIG_PATH_ENV) else {
            return Ok(false);
        };
        info!(path = %path, "Loading configuration provided by environment variable");
        self.load_env_file(&path)?;
        Ok(true)
    }

    // === Update gate ===

    /// Reject every mutation until [`ConfigStore::unblock_update`].
    pub fn block_update(&self) {
        self.blocked.store(true, Ordering::SeqCst);
    }

    pub fn unblock_update(&self) {
        self.blocked.store(false, Ordering::SeqCst);
    }

    pub fn is_update_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    fn ensure_unblocked(&self) -> Result<()> {
        if self.is_update_blocked() {
            return Err(ConfigError::ConfigurationUpdateBlocked);
        }
        Ok(())
    }

    /// Run `f` on the locked state, then recompile and publish.
    fn mutate<T>(&self, f: impl FnOnce(&mut StoreState) -> Result<T>) -> Result<T> {
        self.ensure_unblocked()?;
        let mut state = self.state.lock().unwrap();
        let out = f(&mut *state)?;
        self.applied.store(Arc::new(state.layers.compile()));
        Ok(out)
    }

    // === Registration ===

    /// Record `kind` in the registry. When the registry only held a guess
    /// with the other nature, the kind's entities are moved to `nature` in
    /// every layer. Nothing changes on failure.
    fn register_kind(
        registry: &mut SectionRegistry,
        layers: &mut Layers,
        kind: &str,
        nature: KindNature,
        inferred: bool,
    ) -> Result<()> {
        let reshaped = match registry.nature(kind) {
            Some(guessed) if registry.is_inferred(kind) && guessed != nature => {
                let mut moved = layers.clone();
                moved.reshape(kind, nature)?;
                Some(moved)
            }
            _ => None,
        };
        if inferred {
            registry.infer(kind, nature)?;
        } else {
            registry.register(kind, nature)?;
        }
        if let Some(moved) = reshaped {
            info!(kind = %kind, nature = %nature, "Reshaping kind read before its registration");
            *layers = moved;
        }
        Ok(())
    }

    fn register_section(state: &mut StoreState, section: &Section) -> Result<()> {
        if section.is_global() {
            return Ok(());
        }
        Self::register_kind(
            &mut state.registry,
            &mut state.layers,
            section.kind(),
            section.nature(),
            false,
        )
    }

    /// Insert or widen a kind's default entity in the baseline layer.
    pub fn register_default(&self, section: Section) -> Result<()> {
        self.mutate(|state| {
            Self::register_section(state, &section)?;
            debug!(kind = %section.kind(), id = %section.id(), "Registering default section");
            state.layers.baseline.widen(section);
            Ok(())
        })
    }

    /// Insert or widen an entity in the code layer.
    pub fn register(&self, section: Section) -> Result<()> {
        self.mutate(|state| {
            Self::register_section(state, &section)?;
            debug!(kind = %section.kind(), id = %section.id(), "Registering section");
            state.layers.code.widen(section);
            Ok(())
        })
    }

    /// Declare an entity in the code layer and return its compiled form.
    ///
    /// A collection entity replaces any earlier declaration with the same id;
    /// unique and global-app entities are updated field by field.
    pub fn configure(&self, section: Section) -> Result<Section> {
        let kind = section.kind().to_string();
        let id = section.id().to_string();
        self.mutate(|state| {
            Self::register_section(state, &section)?;
            state.layers.code.put(section);
            Ok(())
        })?;
        self.applied_entity(&kind, &id)
    }

    /// Set global-app attributes in the code layer.
    pub fn configure_global_app(&self, attributes: AttrMap) -> Result<Section> {
        self.configure(Section::global(attributes))
    }

    fn applied_entity(&self, kind: &str, id: &str) -> Result<Section> {
        self.applied
            .load()
            .find(kind, id)
            .cloned()
            .ok_or_else(|| ConfigError::TypeMismatch(format!("{} {} is not configured", kind, id)))
    }

    /// Make `path` resolvable from `function` tagged values.
    pub fn register_function(&self, path: &str, value: Callable) {
        self.state.lock().unwrap().callables.register_function(path, value);
    }

    /// Make `path` resolvable from `class` tagged values.
    pub fn register_class(&self, path: &str, value: Callable) {
        self.state.lock().unwrap().callables.register_class(path, value);
    }

    /// Replace the callable registry used when reading files.
    pub fn set_callables(&self, callables: CallableRegistry) {
        self.state.lock().unwrap().callables = callables;
    }

    // === Compilation ===

    /// Recompile the applied snapshot from the current layers.
    pub fn compile(&self) -> Arc<Snapshot> {
        let state = self.state.lock().unwrap();
        let applied = Arc::new(state.layers.compile());
        self.applied.store(applied.clone());
        applied
    }

    /// The current applied snapshot.
    pub fn applied(&self) -> Arc<Snapshot> {
        self.applied.load_full()
    }

    /// A copy of one layer, if present.
    pub fn layer(&self, layer: Layer) -> Option<Snapshot> {
        self.state.lock().unwrap().layers.get(layer).cloned()
    }

    pub fn registry(&self) -> SectionRegistry {
        self.state.lock().unwrap().registry.clone()
    }

    /// Drop the code, file and env-file layers, and the kinds guessed while
    /// loading files. Registered defaults stay.
    pub fn reset(&self) -> Result<()> {
        self.mutate(|state| {
            info!("Resetting configuration layers");
            state.layers.code = Snapshot::empty();
            state.layers.file = None;
            state.layers.env_file = None;
            state.registry.forget_inferred();
            Ok(())
        })
    }

    // === Loading ===

    /// Decode a document and record its kinds. Kinds the registry did not
    /// declare are recorded as guesses.
    fn decode(state: &mut StoreState, text: &str, format: SerializerFormat) -> Result<Snapshot> {
        let snapshot = codec::decode(text, format, &state.registry, &state.callables)?;
        let kinds = snapshot
            .unique_sections()
            .keys()
            .map(|kind| (kind, KindNature::Unique))
            .chain(
                snapshot
                    .collections()
                    .keys()
                    .map(|kind| (kind, KindNature::Collection)),
            );
        let mut registry = state.registry.clone();
        let mut layers = state.layers.clone();
        for (kind, nature) in kinds {
            Self::register_kind(&mut registry, &mut layers, kind, nature, true)?;
        }
        state.registry = registry;
        state.layers = layers;
        Ok(snapshot)
    }

    fn read(path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
    }

    /// Replace the file layer with the content of `path`. The format is
    /// inferred from the extension.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.load_as(path, SerializerFormat::from_path(path))
    }

    pub fn load_as(&self, path: impl AsRef<Path>, format: SerializerFormat) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), format = %format, "Loading configuration");
        let text = Self::read(path)?;
        self.load_str(&text, format)?;
        info!(path = %path.display(), "Configuration successfully loaded");
        Ok(())
    }

    /// Replace the file layer with configuration text.
    pub fn load_str(&self, text: &str, format: SerializerFormat) -> Result<()> {
        self.mutate(|state| {
            let snapshot = Self::decode(state, text, format)?;
            state.layers.file = Some(snapshot);
            Ok(())
        })
    }

    /// Replace the environment-file layer with the content of `path`.
    pub fn load_env_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = SerializerFormat::from_path(path);
        info!(path = %path.display(), format = %format, "Loading environment configuration");
        let text = Self::read(path)?;
        self.mutate(|state| {
            let snapshot = Self::decode(state, &text, format)?;
            state.layers.env_file = Some(snapshot);
            Ok(())
        })?;
        info!(path = %path.display(), "Configuration successfully loaded");
        Ok(())
    }

    // === Export ===

    /// Render the applied snapshot.
    pub fn to_string(&self, format: SerializerFormat) -> Result<String> {
        codec::encode(&self.applied(), format)
    }

    fn write(path: &Path, snapshot: &Snapshot, format: SerializerFormat) -> Result<()> {
        let text = codec::encode(snapshot, format)?;
        std::fs::write(path, text).map_err(|e| ConfigError::io(path, e))?;
        info!(path = %path.display(), format = %format, "Configuration exported");
        Ok(())
    }

    /// Write the applied snapshot to `path`, overwriting it. The format is
    /// inferred from the extension.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.export_as(path, SerializerFormat::from_path(path))
    }

    pub fn export_as(&self, path: impl AsRef<Path>, format: SerializerFormat) -> Result<()> {
        Self::write(path.as_ref(), &self.applied(), format)
    }

    /// Write only the code layer to `path`.
    pub fn export_code_config(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let code = self.state.lock().unwrap().layers.code.clone();
        Self::write(path, &code, SerializerFormat::from_path(path))
    }

    // === Validation ===

    /// Run `checkers` over the applied snapshot. Every issue is logged at
    /// its own level; error-level issues fail the call.
    pub fn check(&self, checkers: &[&dyn ConfigChecker]) -> Result<IssueCollector> {
        let applied = self.applied();
        let mut collector = IssueCollector::new();
        for checker in checkers {
            debug!(checker = %checker.name(), "Running checker");
            checker.check(&applied, &mut collector);
        }
        collector.log();
        if collector.has_errors() {
            return Err(ConfigError::ConfigurationIssue {
                errors: collector.errors().len(),
            });
        }
        Ok(collector)
    }
}
