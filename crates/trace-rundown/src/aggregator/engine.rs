//! The correlation engine.
//!
//! Runs in two passes. `ingest` walks the event stream once, creating
//! entities on first sighting and recording correlations. `finalize` joins
//! those correlations once the whole stream has been seen: a context's
//! numeric id only becomes known through a script rundown event, which may
//! arrive before or after the target rundown that created the context.

use super::index::{ContextKey, KeyedCorrelationIndex, ScriptKey};
use super::reassembler::SplitValueReassembler;
use super::worklets::WorkletTracker;
use crate::parser::classify::{
    classify, ScriptRundownData, ScriptSourceData, SourceMode, TargetRundownData, TraceEventKind,
};
use crate::parser::event::RawEvent;
use crate::parser::schema::{
    ExecutionContext, ExecutionContextAuxData, OutputModel, Script, Target,
};
use crate::parser::trace::parse_trace_events;
use crate::utils::config::{EngineConfig, UNRESOLVED_CONTEXT_ID};
use crate::utils::error::ParseError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashSet;

/// Counters accumulated across `ingest` calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub events: usize,
    pub target_rundown: usize,
    pub script_rundown: usize,
    pub script_source: usize,
    pub worklet_events: usize,
    pub thread_names: usize,

    /// Events that matched no known shape
    pub unclassified: usize,

    /// Source events ignored by the reassembler
    pub rejected_sources: usize,
}

/// Owns every index for one recording session
#[derive(Debug, Clone)]
pub struct CorrelationEngine {
    config: EngineConfig,

    targets: Vec<Target>,
    target_ids: HashSet<String>,
    execution_contexts: Vec<ExecutionContext>,
    context_tokens: HashSet<String>,
    scripts: Vec<Script>,
    script_keys: HashSet<ScriptKey>,

    script_to_context_token: KeyedCorrelationIndex<ScriptKey, String>,
    script_to_context_id: KeyedCorrelationIndex<ScriptKey, i64>,
    sources: SplitValueReassembler<ScriptKey>,
    worklets: WorkletTracker,

    stats: IngestStats,
}

impl CorrelationEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let worklets = WorkletTracker::new(&config);
        Self {
            config,
            targets: Vec::new(),
            target_ids: HashSet::new(),
            execution_contexts: Vec::new(),
            context_tokens: HashSet::new(),
            scripts: Vec::new(),
            script_keys: HashSet::new(),
            script_to_context_token: KeyedCorrelationIndex::new(),
            script_to_context_id: KeyedCorrelationIndex::new(),
            sources: SplitValueReassembler::new(),
            worklets,
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Forward pass over a batch of events
    ///
    /// May be called several times before `finalize`; batches accumulate.
    /// Events that match no known shape are counted and skipped.
    pub fn ingest<I>(&mut self, events: I)
    where
        I: IntoIterator,
        I::Item: Borrow<RawEvent>,
    {
        let before = self.stats.events;
        for event in events {
            self.ingest_event(event.borrow());
        }
        debug!(
            "Ingested {} events ({} targets, {} contexts, {} scripts so far)",
            self.stats.events - before,
            self.targets.len(),
            self.execution_contexts.len(),
            self.scripts.len()
        );
    }

    /// Decode a whole trace document and ingest its events
    ///
    /// The document is decoded before any state changes, so a failure
    /// leaves everything ingested so far intact.
    ///
    /// # Returns
    /// Number of events ingested
    ///
    /// # Errors
    /// * `ParseError::InvalidFormat` - the document holds no event array
    pub fn ingest_json(&mut self, raw_trace: &serde_json::Value) -> Result<usize, ParseError> {
        let parsed = parse_trace_events(raw_trace)?;
        let count = parsed.events.len();
        self.ingest(&parsed.events);
        Ok(count)
    }

    fn ingest_event(&mut self, event: &RawEvent) {
        self.stats.events += 1;

        let Some(kind) = classify(event) else {
            self.stats.unclassified += 1;
            return;
        };

        match kind {
            TraceEventKind::TargetRundown { pid, data } => {
                self.stats.target_rundown += 1;
                self.record_target_rundown(pid, data);
            }
            TraceEventKind::ScriptRundown(data) => {
                self.stats.script_rundown += 1;
                self.record_script_rundown(data);
            }
            TraceEventKind::ScriptSource { data, mode } => {
                self.stats.script_source += 1;
                if !self.record_script_source(data, mode) {
                    self.stats.rejected_sources += 1;
                }
            }
            TraceEventKind::WorkletRunning(worklet_event) => {
                self.stats.worklet_events += 1;
                self.worklets.record_running(worklet_event);
            }
            TraceEventKind::WorkletDone(worklet_event) => {
                self.stats.worklet_events += 1;
                self.worklets.record_done(worklet_event);
            }
            TraceEventKind::ThreadName(thread) => {
                if self.worklets.record_thread_name(thread) {
                    self.stats.thread_names += 1;
                }
            }
        }
    }

    /// A target rundown names a target, a context token and one script in it
    fn record_target_rundown(&mut self, pid: u64, data: TargetRundownData) {
        self.script_to_context_token.set_if_absent(
            ScriptKey::new(data.script_id, &data.isolate),
            data.v8_context.clone(),
        );

        // First sighting wins; later rundowns for the same target are ignored
        if self.target_ids.insert(data.frame.clone()) {
            self.targets.push(Target {
                target_id: data.frame.clone(),
                target_type: data.frame_type,
                isolate: data.isolate.clone(),
                pid,
                url: data.url,
            });
        }

        if self.context_tokens.insert(data.v8_context.clone()) {
            self.execution_contexts.push(ExecutionContext {
                id: UNRESOLVED_CONTEXT_ID,
                origin: data.origin.unwrap_or_default(),
                v8_context: data.v8_context,
                aux_data: ExecutionContextAuxData {
                    frame_id: Some(data.frame),
                    is_default: data.is_default,
                    context_type: data.context_type,
                },
                isolate: data.isolate,
            });
        }
    }

    /// A script rundown carries the authoritative numeric context id
    fn record_script_rundown(&mut self, data: ScriptRundownData) {
        let key = ScriptKey::new(data.script_id, &data.isolate);
        self.script_to_context_id
            .set_if_absent(key.clone(), data.execution_context_id);

        if !self.script_keys.insert(key) {
            return;
        }

        self.scripts.push(Script {
            script_id: data.script_id,
            isolate: data.isolate,
            execution_context_id: data.execution_context_id,
            start_line: data.start_line,
            start_column: data.start_column,
            end_line: data.end_line,
            end_column: data.end_column,
            hash: data.hash,
            is_module: data.is_module,
            url: data.url.unwrap_or_default(),
            has_source_url: data.has_source_url,
            source_map_url: data.source_map_url,
            length: None,
            source_text: None,
            aux_data: None,
        });
    }

    fn record_script_source(&mut self, data: ScriptSourceData, mode: SourceMode) -> bool {
        let key = ScriptKey::new(data.script_id, &data.isolate);
        match mode {
            SourceMode::Whole { length } => self.sources.set_whole(key, data.source_text, length),
            SourceMode::Split { count, .. } if count > self.config.max_split_count => {
                debug!(
                    "Ignoring source fragment for {}: split count {} exceeds {}",
                    key, count, self.config.max_split_count
                );
                false
            }
            SourceMode::Split { index, count } => {
                self.sources
                    .begin_or_continue(key, index, count, data.source_text)
            }
        }
    }

    /// Second pass: backfill what needed the whole stream, then snapshot
    ///
    /// Reads the accumulated state without consuming it; calling it twice
    /// yields equal models. Each collection is sorted by its key, so the
    /// model does not depend on the order unrelated events arrived in.
    pub fn finalize(&self) -> OutputModel {
        let token_to_id = self.resolve_context_ids();

        let mut targets = self.targets.clone();
        targets.sort_by(|a, b| a.target_id.cmp(&b.target_id));

        let mut execution_contexts: Vec<ExecutionContext> = self
            .execution_contexts
            .iter()
            .map(|context| {
                let mut context = context.clone();
                if let Some(id) = token_to_id.get(&context.v8_context) {
                    context.id = *id;
                }
                context
            })
            .collect();
        execution_contexts.sort_by(|a, b| a.v8_context.cmp(&b.v8_context));

        // Aux data is looked up by resolved id, so this must follow the backfill
        let mut aux_by_context = KeyedCorrelationIndex::new();
        for context in execution_contexts.iter().filter(|c| c.is_resolved()) {
            aux_by_context.set_if_absent(
                ContextKey::new(context.id, &context.isolate),
                context.aux_data.clone(),
            );
        }

        let mut scripts: Vec<Script> = self
            .scripts
            .iter()
            .map(|script| {
                let mut script = script.clone();
                if let Some(source) = self.sources.lookup(&script.key()) {
                    script.source_text = source.text;
                    script.length = source.length;
                }
                if script.execution_context_id != UNRESOLVED_CONTEXT_ID {
                    script.aux_data = aux_by_context
                        .get(&ContextKey::new(script.execution_context_id, &script.isolate))
                        .cloned();
                }
                script
            })
            .collect();
        scripts.sort_by_key(Script::key);

        let mut worklets = self.worklets.pair();
        worklets.sort_by(|a, b| a.target.cmp(&b.target));

        debug!(
            "Finalized {} targets, {} execution contexts ({} resolved), {} scripts, {} worklets",
            targets.len(),
            execution_contexts.len(),
            execution_contexts.iter().filter(|c| c.is_resolved()).count(),
            scripts.len(),
            worklets.len()
        );

        OutputModel::new(targets, execution_contexts, scripts, worklets)
    }

    /// Join script -> token with script -> id into token -> id
    ///
    /// Visits scripts in key order so the result does not depend on hash or
    /// arrival order; the first id seen for a token is kept.
    fn resolve_context_ids(&self) -> KeyedCorrelationIndex<String, i64> {
        let mut correlations: Vec<(&ScriptKey, &i64)> = self.script_to_context_id.iter().collect();
        correlations.sort_by(|a, b| a.0.cmp(b.0));

        let mut token_to_id = KeyedCorrelationIndex::new();
        for (script_key, context_id) in correlations {
            let Some(token) = self.script_to_context_token.get(script_key) else {
                continue;
            };
            if !token_to_id.set_if_absent(token.clone(), *context_id) {
                let existing = token_to_id.get(token).copied();
                if existing != Some(*context_id) {
                    debug!(
                        "Context {} already resolved to {:?}, ignoring id {} from script {}",
                        token, existing, context_id, script_key
                    );
                }
            }
        }

        token_to_id
    }

    /// Drop all accumulated state so the engine can take a new session
    pub fn reset(&mut self) {
        self.targets.clear();
        self.target_ids.clear();
        self.execution_contexts.clear();
        self.context_tokens.clear();
        self.scripts.clear();
        self.script_keys.clear();
        self.script_to_context_token.clear();
        self.script_to_context_id.clear();
        self.sources.clear();
        self.worklets.clear();
        self.stats = IngestStats::default();
    }
}

impl Default for CorrelationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::{SCRIPT_SOURCE_CATEGORY, TARGET_RUNDOWN_CATEGORY};
    use serde_json::json;

    fn event(value: serde_json::Value) -> RawEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_stats_count_each_kind() {
        let mut engine = CorrelationEngine::new();
        engine.ingest(vec![
            event(json!({ "cat": "devtools.timeline", "name": "Layout" })),
            event(json!({
                "cat": TARGET_RUNDOWN_CATEGORY,
                "args": { "data": {
                    "frame": "F", "frameType": "page", "url": "u", "isolate": "i",
                    "v8context": "c", "scriptId": 1
                } }
            })),
            event(json!({ "name": "thread_name", "ph": "M", "args": { "name": "CrBrowserMain" } })),
        ]);

        let stats = engine.stats();
        assert_eq!(stats.events, 3);
        assert_eq!(stats.target_rundown, 1);
        assert_eq!(stats.unclassified, 1);
        // Thread names only count when they name a worklet thread
        assert_eq!(stats.thread_names, 0);
    }

    #[test]
    fn test_oversized_split_is_rejected() {
        let config = EngineConfig {
            max_split_count: 4,
            ..EngineConfig::default()
        };
        let mut engine = CorrelationEngine::with_config(config);
        engine.ingest([event(json!({
            "cat": SCRIPT_SOURCE_CATEGORY,
            "args": { "data": {
                "isolate": "i", "scriptId": 1, "sourceText": "x",
                "splitIndex": 0, "splitCount": 5
            } }
        }))]);

        assert_eq!(engine.stats().script_source, 1);
        assert_eq!(engine.stats().rejected_sources, 1);
    }

    #[test]
    fn test_ingest_json_failure_keeps_state() {
        let mut engine = CorrelationEngine::new();
        let ingested = engine
            .ingest_json(&json!([{
                "cat": TARGET_RUNDOWN_CATEGORY,
                "args": { "data": {
                    "frame": "F", "frameType": "page", "url": "u", "isolate": "i",
                    "v8context": "c", "scriptId": 1
                } }
            }]))
            .unwrap();
        assert_eq!(ingested, 1);

        assert!(engine.ingest_json(&json!("not a trace")).is_err());
        assert_eq!(engine.finalize().targets().len(), 1);
        assert_eq!(engine.stats().events, 1);
    }
}
