//! Layered configuration.
//!
//! Four layers are merged into the applied snapshot, lowest precedence
//! first:
//! 1. **Baseline** - default entities registered by kinds
//! 2. **Code** - entities declared through `configure_*` calls
//! 3. **File** - the last file passed to `load`
//! 4. **Env file** - the file named by `LAYERCONF_CONFIG_PATH`
//!
//! ## Merge Strategy
//! - Global-app and unique entities: field by field, later layers win
//! - Collection kinds: the incoming default is merged first, then every
//!   other entity is merged over its current value or created from the
//!   merged default

pub mod layer;
pub mod merge;
pub mod registry;
pub mod section;
pub mod snapshot;
pub mod store;

pub use layer::{Layer, Layers};
pub use registry::SectionRegistry;
pub use section::{
    DEFAULT_ID, GLOBAL_DISPLAY_NAME, GLOBAL_KIND, KindNature, Section, UNIQUE_ID, validate_id,
};
pub use snapshot::Snapshot;
pub use store::{CONFIG_PATH_ENV, ConfigStore};
