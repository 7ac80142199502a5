//! Job execution settings. A unique kind.

use super::{extra_properties, insert_opt, resolved_int, resolved_str};
use crate::attrs;
use crate::config::section::{KindNature, Section};
use crate::config::snapshot::Snapshot;
use crate::config::store::ConfigStore;
use crate::error::Result;
use crate::types::AttrMap;

pub const KIND: &str = "JOB";

pub const MODE: &str = "mode";
pub const MAX_NB_OF_WORKERS: &str = "max_nb_of_workers";

pub const MODE_STANDALONE: &str = "standalone";
pub const MODE_DEVELOPMENT: &str = "development";
pub const DEFAULT_MAX_NB_OF_WORKERS: i64 = 1;

const FIXED: &[&str] = &[MODE, MAX_NB_OF_WORKERS];

pub fn default_section() -> Section {
    Section::builtin(
        KIND,
        KindNature::Unique,
        attrs! {MODE => MODE_STANDALONE, MAX_NB_OF_WORKERS => DEFAULT_MAX_NB_OF_WORKERS},
    )
}

#[derive(Debug, Clone, Copy)]
pub struct JobConfig<'a> {
    section: &'a Section,
}

impl<'a> JobConfig<'a> {
    pub fn new(section: &'a Section) -> Self {
        Self { section }
    }

    pub fn section(&self) -> &'a Section {
        self.section
    }

    pub fn mode(&self) -> Result<String> {
        Ok(resolved_str(self.section, MODE)?.unwrap_or_else(|| MODE_STANDALONE.to_string()))
    }

    pub fn is_development(&self) -> Result<bool> {
        Ok(self.mode()? == MODE_DEVELOPMENT)
    }

    pub fn max_nb_of_workers(&self) -> Result<i64> {
        Ok(resolved_int(self.section, MAX_NB_OF_WORKERS)?.unwrap_or(DEFAULT_MAX_NB_OF_WORKERS))
    }

    pub fn properties(&self) -> Result<AttrMap> {
        extra_properties(self.section, FIXED)
    }
}

impl Snapshot {
    /// Job settings. `None` only for a snapshot compiled without built-ins.
    pub fn job(&self) -> Option<JobConfig<'_>> {
        self.unique(KIND).map(JobConfig::new)
    }
}

impl ConfigStore {
    /// Update the job execution settings. Unset fields keep their current
    /// value.
    pub fn configure_job_executions(
        &self,
        mode: Option<&str>,
        max_nb_of_workers: Option<i64>,
        mut properties: AttrMap,
    ) -> Result<Section> {
        insert_opt(&mut properties, MODE, mode);
        insert_opt(&mut properties, MAX_NB_OF_WORKERS, max_nb_of_workers);
        self.configure(Section::unique(KIND, properties)?)
    }
}
