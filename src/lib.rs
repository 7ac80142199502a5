//! Layered configuration engine.
//!
//! This module exports the store, the codec and the comparator for
//! embedding applications and the `layerconf` binary.

pub mod checker;
pub mod cli;
pub mod codec;
pub mod compare;
pub mod config;
pub mod error;
pub mod logging;
pub mod sections;
pub mod template;
pub mod types;

pub use checker::{ConfigChecker, Issue, IssueCollector, IssueLevel};
pub use codec::{CallableRegistry, SerializerFormat};
pub use compare::{CompareOptions, ComparatorResult, ConfigComparator};
pub use config::{ConfigStore, KindNature, Layer, Section, Snapshot};
pub use error::{ConfigError, ErrorCode, Result};
pub use template::{EnvSource, ProcessEnv, TargetType, TemplateResolver};
pub use types::{AttrMap, Frequency, Scope, Value};
