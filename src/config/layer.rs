//! Configuration layers.

use super::section::KindNature;
use super::snapshot::Snapshot;
use crate::error::Result;

/// Configuration layer priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    /// Registered defaults of every kind (lowest priority)
    Baseline = 0,
    /// Entities declared by application code
    Code = 1,
    /// Entities loaded from a configuration file
    File = 2,
    /// Entities loaded from the file named by `LAYERCONF_CONFIG_PATH` (highest priority)
    EnvFile = 3,
}

impl Layer {
    /// All layers, in merge order.
    pub const ALL: [Layer; 4] = [Layer::Baseline, Layer::Code, Layer::File, Layer::EnvFile];
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layer::Baseline => write!(f, "baseline"),
            Layer::Code => write!(f, "code"),
            Layer::File => write!(f, "file"),
            Layer::EnvFile => write!(f, "env-file"),
        }
    }
}

/// The four layers of a store.
#[derive(Debug, Clone, Default)]
pub struct Layers {
    pub baseline: Snapshot,
    pub code: Snapshot,
    pub file: Option<Snapshot>,
    pub env_file: Option<Snapshot>,
}

impl Layers {
    pub fn get(&self, layer: Layer) -> Option<&Snapshot> {
        match layer {
            Layer::Baseline => Some(&self.baseline),
            Layer::Code => Some(&self.code),
            Layer::File => self.file.as_ref(),
            Layer::EnvFile => self.env_file.as_ref(),
        }
    }

    /// Move the entities of `kind` to `nature` in every layer.
    pub fn reshape(&mut self, kind: &str, nature: KindNature) -> Result<()> {
        self.baseline.reshape(kind, nature)?;
        self.code.reshape(kind, nature)?;
        for snapshot in [&mut self.file, &mut self.env_file].into_iter().flatten() {
            snapshot.reshape(kind, nature)?;
        }
        Ok(())
    }

    /// Merge the layers present, lowest priority first, into a fresh snapshot.
    pub fn compile(&self) -> Snapshot {
        let mut applied = Snapshot::empty();
        for layer in Layer::ALL {
            if let Some(snapshot) = self.get(layer) {
                tracing::debug!(layer = %layer, "Applying configuration layer");
                applied.merge(snapshot);
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use crate::config::section::Section;
    use crate::types::Value;

    #[test]
    fn test_layer_ordering() {
        assert!(Layer::Baseline < Layer::Code);
        assert!(Layer::Code < Layer::File);
        assert!(Layer::File < Layer::EnvFile);
    }

    #[test]
    fn test_layer_display() {
        assert_eq!(Layer::Baseline.to_string(), "baseline");
        assert_eq!(Layer::EnvFile.to_string(), "env-file");
    }

    #[test]
    fn test_compile_precedence() {
        let entity = |v: &str| Section::collection("KIND", "x", attrs! {"attr" => v}).unwrap();
        let mut layers = Layers::default();
        layers.baseline.put(entity("baseline"));
        layers.code.put(entity("code"));
        let applied = layers.compile();
        assert_eq!(
            applied.section("KIND", "x").unwrap().get("attr"),
            Some(&Value::from("code"))
        );

        let mut file = Snapshot::empty();
        file.put(entity("file"));
        layers.file = Some(file);
        let mut env_file = Snapshot::empty();
        env_file.put(entity("env"));
        layers.env_file = Some(env_file);
        let applied = layers.compile();
        assert_eq!(
            applied.section("KIND", "x").unwrap().get("attr"),
            Some(&Value::from("env"))
        );
    }

    #[test]
    fn test_compile_is_idempotent() {
        let mut layers = Layers::default();
        layers
            .baseline
            .put(Section::collection_default("KIND", attrs! {"a" => 1}).unwrap());
        layers
            .code
            .put(Section::collection("KIND", "x", attrs! {"b" => 2}).unwrap());
        assert_eq!(layers.compile(), layers.compile());
    }
}
