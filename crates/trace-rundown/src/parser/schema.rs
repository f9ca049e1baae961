//! Output schema definitions for the reconstructed model.
//!
//! This module defines the entities the engine emits and the JSON shape
//! they are written in. Keys are camelCase to match the trace producers.

use crate::aggregator::index::ScriptKey;
use crate::aggregator::registry::UniqueRegistry;
use crate::utils::config::UNRESOLVED_CONTEXT_ID;
use crate::utils::error::ModelError;
use log::debug;
use serde::{Deserialize, Serialize};

/// A process-level execution host (a frame, a worker, a worklet host)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// Frame or host identifier
    pub target_id: String,

    /// Kind of host (e.g. "page", "iframe")
    #[serde(rename = "type")]
    pub target_type: String,

    pub isolate: String,
    pub pid: u64,
    pub url: String,
}

/// Frame and role details attached to an execution context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContextAuxData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub context_type: Option<String>,
}

/// A JS execution context inside a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    /// Numeric id, `UNRESOLVED_CONTEXT_ID` when no script rundown named it
    pub id: i64,

    #[serde(default)]
    pub origin: String,

    /// Opaque context token used for correlation before `id` is known
    pub v8_context: String,

    #[serde(default)]
    pub aux_data: ExecutionContextAuxData,

    pub isolate: String,
}

impl ExecutionContext {
    /// Whether the backfill pass found a numeric id for this context
    pub fn is_resolved(&self) -> bool {
        self.id != UNRESOLVED_CONTEXT_ID
    }
}

/// A parsed script or module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub script_id: u64,
    pub isolate: String,
    pub execution_context_id: i64,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub hash: String,
    pub is_module: bool,

    #[serde(default)]
    pub url: String,

    pub has_source_url: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map_url: Option<String>,

    /// Source length in UTF-16 code units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,

    /// Copied from the owning execution context during finalize
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux_data: Option<ExecutionContextAuxData>,
}

impl Script {
    pub fn key(&self) -> ScriptKey {
        ScriptKey::new(self.script_id, &self.isolate)
    }
}

/// Role of an auction worklet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkletType {
    Seller,
    Bidder,
    Unknown,
}

impl std::str::FromStr for WorkletType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "seller" => Self::Seller,
            "bidder" => Self::Bidder,
            _ => Self::Unknown,
        })
    }
}

impl WorkletType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Seller => "seller",
            Self::Bidder => "bidder",
            Self::Unknown => "unknown",
        }
    }
}

/// Payload shared by both halves of a worklet lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkletProcessData {
    pub host: String,

    /// Process the worklet runs in (not the emitting process)
    pub pid: u64,

    /// Token shared by the "running" and "done" halves
    pub target: String,

    #[serde(rename = "type")]
    pub worklet_type: String,
}

/// A decoded "running in process" or "done with process" event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkletProcessEvent {
    pub cat: String,
    pub pid: u64,
    pub tid: u64,
    pub ts: f64,
    pub data: WorkletProcessData,
}

/// A named thread, discovered from `thread_name` metadata events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadDescriptor {
    pub pid: u64,
    pub tid: u64,
    pub name: String,
}

/// One auction worklet, pairing its start and end halves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkletLifecycle {
    pub cat: String,
    pub tid: u64,
    pub ts: f64,

    /// Process the worklet runs in
    pub pid: u64,

    pub host: String,
    pub target: String,

    #[serde(rename = "type")]
    pub worklet_type: WorkletType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_in_process_event: Option<WorkletProcessEvent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_with_process_event: Option<WorkletProcessEvent>,

    pub utility_thread: ThreadDescriptor,
    pub v8_helper_thread: ThreadDescriptor,
}

/// Loosely checked model contents, as read back from disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelParts {
    pub targets: Vec<Target>,
    pub execution_contexts: Vec<ExecutionContext>,
    pub scripts: Vec<Script>,
    pub worklets: Vec<WorkletLifecycle>,
}

/// A target with the contexts and scripts running in it
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGroup<'a> {
    pub target: &'a Target,
    pub execution_contexts: Vec<&'a ExecutionContext>,
    pub scripts: Vec<&'a Script>,
}

/// The finalized, read-only result of a correlation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputModel {
    targets: Vec<Target>,
    execution_contexts: Vec<ExecutionContext>,
    scripts: Vec<Script>,
    worklets: Vec<WorkletLifecycle>,
}

impl OutputModel {
    /// Assemble a model whose keys are already known to be unique
    pub(crate) fn new(
        targets: Vec<Target>,
        execution_contexts: Vec<ExecutionContext>,
        scripts: Vec<Script>,
        worklets: Vec<WorkletLifecycle>,
    ) -> Self {
        Self {
            targets,
            execution_contexts,
            scripts,
            worklets,
        }
    }

    /// Rebuild a model from deserialized parts, rejecting duplicate keys
    ///
    /// # Errors
    /// * `ModelError::DuplicateKey` - two entities of one kind share a key
    pub fn from_parts(parts: ModelParts) -> Result<Self, ModelError> {
        let mut targets = UniqueRegistry::new("target");
        for target in &parts.targets {
            targets.insert(target.target_id.clone())?;
        }

        let mut contexts = UniqueRegistry::new("execution context");
        for context in &parts.execution_contexts {
            contexts.insert(context.v8_context.clone())?;
        }

        let mut scripts = UniqueRegistry::new("script");
        for script in &parts.scripts {
            scripts.insert(script.key())?;
        }

        let mut worklets = UniqueRegistry::new("worklet");
        for worklet in &parts.worklets {
            worklets.insert(worklet.target.clone())?;
        }

        Ok(Self::new(
            parts.targets,
            parts.execution_contexts,
            parts.scripts,
            parts.worklets,
        ))
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn execution_contexts(&self) -> &[ExecutionContext] {
        &self.execution_contexts
    }

    pub fn scripts(&self) -> &[Script] {
        &self.scripts
    }

    pub fn worklets(&self) -> &[WorkletLifecycle] {
        &self.worklets
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
            && self.execution_contexts.is_empty()
            && self.scripts.is_empty()
            && self.worklets.is_empty()
    }

    pub fn target(&self, target_id: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.target_id == target_id)
    }

    pub fn execution_context(&self, v8_context: &str) -> Option<&ExecutionContext> {
        self.execution_contexts
            .iter()
            .find(|c| c.v8_context == v8_context)
    }

    pub fn script(&self, script_id: u64, isolate: &str) -> Option<&Script> {
        self.scripts
            .iter()
            .find(|s| s.script_id == script_id && s.isolate == isolate)
    }

    pub fn worklet(&self, target: &str) -> Option<&WorkletLifecycle> {
        self.worklets.iter().find(|w| w.target == target)
    }

    /// Contexts and scripts that belong to `target`
    ///
    /// A context belongs to the target named by its `auxData.frameId`; a
    /// script belongs through the aux data copied from its context, so
    /// scripts whose context never resolved belong to no target.
    pub fn contexts_and_scripts_for(
        &self,
        target: &Target,
    ) -> (Vec<&ExecutionContext>, Vec<&Script>) {
        self.log_scripts_without_aux_data();
        self.group_under(target)
    }

    /// Every target with its contexts and scripts, in target order
    pub fn by_target(&self) -> Vec<TargetGroup<'_>> {
        self.log_scripts_without_aux_data();
        self.targets
            .iter()
            .map(|target| {
                let (execution_contexts, scripts) = self.group_under(target);
                TargetGroup {
                    target,
                    execution_contexts,
                    scripts,
                }
            })
            .collect()
    }

    fn group_under(&self, target: &Target) -> (Vec<&ExecutionContext>, Vec<&Script>) {
        let belongs = |frame_id: Option<&String>| frame_id == Some(&target.target_id);

        let execution_contexts = self
            .execution_contexts
            .iter()
            .filter(|c| belongs(c.aux_data.frame_id.as_ref()))
            .collect();
        let scripts = self
            .scripts
            .iter()
            .filter(|s| belongs(s.aux_data.as_ref().and_then(|aux| aux.frame_id.as_ref())))
            .collect();

        (execution_contexts, scripts)
    }

    fn log_scripts_without_aux_data(&self) {
        for script in self.scripts.iter().filter(|s| s.aux_data.is_none()) {
            debug!("Script {} is missing aux data", script.key());
        }
    }

    /// Copy of the model with script bodies dropped (lengths are kept)
    pub fn without_source_text(&self) -> Self {
        let mut stripped = self.clone();
        for script in &mut stripped.scripts {
            script.source_text = None;
        }
        stripped
    }
}
