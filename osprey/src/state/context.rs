//! Context store: namespaced, keyed storage of typed capability outputs.
//!
//! Lives inside agent state at `context[type][key]`. Entries are write-once
//! for the lifetime of one conversation turn; capabilities reference each
//! other's outputs through context keys, never direct pointers. Every stored
//! context is serializable to a compact string form for LLM inclusion, and
//! large values are recursively truncated when building prompts.

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors from context store operations.
#[derive(Debug, Error, PartialEq)]
pub enum ContextError {
    /// A `(type, key)` slot was written twice within one turn.
    #[error("duplicate context key: {context_type}[{key}]")]
    DuplicateContextKey { context_type: String, key: String },
    /// A step input named a key no stored context has.
    #[error("unknown context key: {key} (available: {available:?})")]
    UnknownContextKey { key: String, available: Vec<String> },
    /// Cardinality `single` matched a list-valued context, or several matches.
    #[error("cardinality violation for type {context_type}: {message}")]
    CardinalityViolation {
        context_type: String,
        message: String,
    },
}

/// A typed, serializable value produced by a capability.
///
/// Implementors contribute one summary line to `list_summaries()` and a JSON
/// body stored under their type/key.
pub trait ContextObject: Send + Sync {
    /// Context type name (e.g. `"CHANNEL_VALUES"`).
    fn context_type(&self) -> &str;
    /// One-line human/LLM-readable summary.
    fn summary(&self) -> String;
    /// JSON body stored in the context store.
    fn to_value(&self) -> serde_json::Value;
}

/// Metadata recorded with every stored context.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContextMeta {
    /// Why this context was produced (the step's task objective).
    pub task_objective: String,
    /// Capability that produced it.
    pub produced_by: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
}

/// One stored context: JSON value + summary + metadata.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredContext {
    pub value: serde_json::Value,
    pub summary: String,
    pub meta: ContextMeta,
}

/// One line of `list_summaries()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSummary {
    pub context_type: String,
    pub key: String,
    pub task_objective: String,
    pub summary: String,
}

/// Cardinality constraint on a required context type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Exactly one match; a list-valued result is an error.
    Single,
    /// Always a list; singletons are wrapped.
    Multiple,
    /// Return object or list as stored.
    Any,
}

/// A capability's declared input: type plus cardinality.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContextRequirement {
    pub context_type: String,
    pub cardinality: Cardinality,
}

impl ContextRequirement {
    pub fn single(context_type: impl Into<String>) -> Self {
        Self {
            context_type: context_type.into(),
            cardinality: Cardinality::Single,
        }
    }

    pub fn multiple(context_type: impl Into<String>) -> Self {
        Self {
            context_type: context_type.into(),
            cardinality: Cardinality::Multiple,
        }
    }

    pub fn any(context_type: impl Into<String>) -> Self {
        Self {
            context_type: context_type.into(),
            cardinality: Cardinality::Any,
        }
    }
}

/// Value extracted for one required type: one context or an ordered list.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedValue {
    One(StoredContext),
    Many(Vec<StoredContext>),
}

/// Contexts extracted for one step, keyed by context type.
pub type ExtractedContexts = BTreeMap<String, ExtractedValue>;

/// Two-level mapping `context_type → context_key → stored context`.
///
/// **Interaction**: read by orchestration (summaries), the capability runner
/// (`extract_for_step`), and respond; written through `store` by capabilities.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContextStore {
    entries: BTreeMap<String, BTreeMap<String, StoredContext>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write-once store. A second write to the same `(type, key)` within a
    /// turn fails with `DuplicateContextKey`.
    pub fn store(
        &mut self,
        context_type: impl Into<String>,
        key: impl Into<String>,
        value: serde_json::Value,
        summary: impl Into<String>,
        task_objective: impl Into<String>,
        produced_by: impl Into<String>,
    ) -> Result<(), ContextError> {
        let context_type = context_type.into();
        let key = key.into();
        let slot = self.entries.entry(context_type.clone()).or_default();
        if slot.contains_key(&key) {
            return Err(ContextError::DuplicateContextKey { context_type, key });
        }
        slot.insert(
            key,
            StoredContext {
                value,
                summary: summary.into(),
                meta: ContextMeta {
                    task_objective: task_objective.into(),
                    produced_by: produced_by.into(),
                    created_at: chrono::Utc::now().to_rfc3339(),
                },
            },
        );
        Ok(())
    }

    /// Stores a typed context object under its declared type.
    pub fn store_object(
        &mut self,
        key: impl Into<String>,
        object: &dyn ContextObject,
        task_objective: impl Into<String>,
        produced_by: impl Into<String>,
    ) -> Result<(), ContextError> {
        self.store(
            object.context_type().to_string(),
            key,
            object.to_value(),
            object.summary(),
            task_objective,
            produced_by,
        )
    }

    /// Lookup by type and key.
    pub fn get(&self, context_type: &str, key: &str) -> Option<&StoredContext> {
        self.entries.get(context_type)?.get(key)
    }

    /// True when any type holds the given key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.values().any(|m| m.contains_key(key))
    }

    /// Finds a key across all types, returning `(type, context)`.
    pub fn find_key(&self, key: &str) -> Option<(&str, &StoredContext)> {
        self.entries
            .iter()
            .find_map(|(t, m)| m.get(key).map(|c| (t.as_str(), c)))
    }

    /// All stored keys, in type order then key order.
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .values()
            .flat_map(|m| m.keys().cloned())
            .collect()
    }

    /// True when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|m| m.is_empty())
    }

    /// Returns the contexts named by `inputs`, validated against the
    /// capability's declared requirements.
    ///
    /// Inputs resolve across all types; each resolved context is grouped
    /// under its type, preserving input order within a type. Requirements
    /// with cardinality `Single` reject zero or multiple matches; `Multiple`
    /// always yields a list; `Any` yields one context or a list as matched.
    /// Requirements with no matching input fail with a cardinality violation
    /// (except `Multiple`, which yields an empty list).
    pub fn extract_for_step(
        &self,
        inputs: &[String],
        requirements: &[ContextRequirement],
    ) -> Result<ExtractedContexts, ContextError> {
        let mut by_type: BTreeMap<String, Vec<StoredContext>> = BTreeMap::new();
        for key in inputs {
            let (context_type, ctx) =
                self.find_key(key).ok_or_else(|| ContextError::UnknownContextKey {
                    key: key.clone(),
                    available: self.keys(),
                })?;
            by_type
                .entry(context_type.to_string())
                .or_default()
                .push(ctx.clone());
        }

        let mut out = ExtractedContexts::new();
        if requirements.is_empty() {
            // No declared requirements: hand over whatever the inputs name.
            for (context_type, mut list) in by_type {
                let value = if list.len() == 1 {
                    ExtractedValue::One(list.remove(0))
                } else {
                    ExtractedValue::Many(list)
                };
                out.insert(context_type, value);
            }
            return Ok(out);
        }

        for req in requirements {
            let matched = by_type.remove(&req.context_type).unwrap_or_default();
            let value = match req.cardinality {
                Cardinality::Single => match matched.len() {
                    1 => ExtractedValue::One(matched.into_iter().next().unwrap()),
                    0 => {
                        return Err(ContextError::CardinalityViolation {
                            context_type: req.context_type.clone(),
                            message: "expected exactly one context, got none".into(),
                        })
                    }
                    n => {
                        return Err(ContextError::CardinalityViolation {
                            context_type: req.context_type.clone(),
                            message: format!("expected exactly one context, got {}", n),
                        })
                    }
                },
                Cardinality::Multiple => ExtractedValue::Many(matched),
                Cardinality::Any => match matched.len() {
                    0 => {
                        return Err(ContextError::CardinalityViolation {
                            context_type: req.context_type.clone(),
                            message: "expected at least one context, got none".into(),
                        })
                    }
                    1 => ExtractedValue::One(matched.into_iter().next().unwrap()),
                    _ => ExtractedValue::Many(matched),
                },
            };
            out.insert(req.context_type.clone(), value);
        }

        // Inputs of undeclared types pass through unvalidated.
        for (context_type, mut list) in by_type {
            let value = if list.len() == 1 {
                ExtractedValue::One(list.remove(0))
            } else {
                ExtractedValue::Many(list)
            };
            out.insert(context_type, value);
        }
        Ok(out)
    }

    /// One `{type, key, task_objective, summary}` line per stored context.
    pub fn list_summaries(&self) -> Vec<ContextSummary> {
        self.entries
            .iter()
            .flat_map(|(context_type, slots)| {
                slots.iter().map(move |(key, ctx)| ContextSummary {
                    context_type: context_type.clone(),
                    key: key.clone(),
                    task_objective: ctx.meta.task_objective.clone(),
                    summary: ctx.summary.clone(),
                })
            })
            .collect()
    }

    /// Copy of the store without any entries of the given type (used when a
    /// consumed signal, e.g. a clarification, must not leak into the next turn).
    pub fn without_type(&self, context_type: &str) -> ContextStore {
        let mut out = self.clone();
        out.entries.remove(context_type);
        out
    }

    /// Copy of the store with oversized values recursively truncated for
    /// prompt inclusion (strings cut to `budget` bytes, long arrays elided).
    pub fn truncated_for_prompt(&self, budget: usize) -> ContextStore {
        let mut out = self.clone();
        for slots in out.entries.values_mut() {
            for ctx in slots.values_mut() {
                truncate_value(&mut ctx.value, budget);
            }
        }
        out
    }
}

/// Recursively truncates strings above `budget` bytes and elides the middle
/// of arrays longer than 32 elements.
fn truncate_value(value: &mut serde_json::Value, budget: usize) {
    match value {
        serde_json::Value::String(s) => {
            if s.len() > budget {
                let mut cut = budget;
                while !s.is_char_boundary(cut) {
                    cut -= 1;
                }
                s.truncate(cut);
                s.push_str("… [truncated]");
            }
        }
        serde_json::Value::Array(items) => {
            const KEEP: usize = 16;
            if items.len() > 2 * KEEP {
                let tail = items.split_off(items.len() - KEEP);
                items.truncate(KEEP);
                items.push(serde_json::Value::String("… [elided]".into()));
                items.extend(tail);
            }
            for item in items.iter_mut() {
                truncate_value(item, budget);
            }
        }
        serde_json::Value::Object(map) => {
            for (_, v) in map.iter_mut() {
                truncate_value(v, budget);
            }
        }
        _ => {}
    }
}
