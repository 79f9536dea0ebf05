//! Data-source providers: optional context strings for task extraction.
//!
//! A data source enriches the task-extraction prompt with ambient context
//! (recent logbook entries, archived session notes). Registered via
//! `DataSourceRegistration`.

use async_trait::async_trait;

use crate::state::AgentState;

/// Provides context strings for the task-extraction prompt.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn name(&self) -> &str;

    /// Context lines to append to the task-extraction prompt. Failures should
    /// be swallowed into an empty result; data sources are best-effort.
    async fn context_strings(&self, state: &AgentState) -> Vec<String>;
}
