//! Two-phase placeholder substitution against a live document.
//!
//! Phase 1 swaps every `{{Key}}` for a sentinel with one flat replace-all
//! batch. The document is then re-read, because phase 1 changed text lengths
//! and every offset computed before it is stale. Phase 2 deletes each
//! discovered sentinel and inserts its compiled markdown, highest offset
//! first, in a second batch.
//!
//! The two batches are not transactional. A run that fails after phase 1
//! leaves sentinels in the document; [`RunState::has_orphaned_sentinels`]
//! reports that case. Callers must serialize runs against the same document.

use std::collections::{BTreeMap, HashMap};

use anyhow::Context as _;
use serde::Serialize;

use crate::docs::{DocumentService, Request};
use crate::patch::{Anchored, compile_markdown, order_for_application};
use crate::search::{SENTINEL_PREFIX, SENTINEL_SUFFIX, find_sentinels};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Created,
    SentinelsInjected,
    MatchesDiscovered,
    PatchesApplied,
}

impl RunState {
    /// True when the document may still hold sentinels from this run.
    pub fn has_orphaned_sentinels(self) -> bool {
        matches!(self, RunState::SentinelsInjected | RunState::MatchesDiscovered)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderMatch {
    pub sentinel: String,
    pub start: usize,
    pub end: usize,
    pub original_key: String,
}

impl Anchored for PlaceholderMatch {
    fn anchor(&self) -> usize {
        self.start
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubstitutionReport {
    pub document_id: String,
    pub applied: Vec<PlaceholderMatch>,
    /// Sentinels found in the document with no replacement; left in place.
    pub unresolved: Vec<String>,
    /// Sentinels found more often than phase 1 injected them.
    pub collisions: Vec<String>,
    pub operations: usize,
}

pub fn placeholder_for(key: &str) -> String {
    format!("{{{{{key}}}}}")
}

/// `__REPLACE<key>__` with every non-alphanumeric character of `key` removed.
pub fn sentinel_for(key: &str) -> String {
    let token: String = key.chars().filter(char::is_ascii_alphanumeric).collect();
    format!("{SENTINEL_PREFIX}{token}{SENTINEL_SUFFIX}")
}

#[derive(Debug, Clone)]
struct PlannedKey {
    key: String,
    sentinel: String,
    /// `occurrencesChanged` reported for this key's replace-all, once known.
    injected: Option<usize>,
}

pub struct Substitution<'a> {
    service: &'a dyn DocumentService,
    document_id: String,
    replacements: BTreeMap<String, String>,
    planned: Vec<PlannedKey>,
    state: RunState,
    matches: Vec<PlaceholderMatch>,
    report: SubstitutionReport,
}

impl<'a> Substitution<'a> {
    /// Validates the batch; nothing is sent to the service yet.
    pub fn new(
        service: &'a dyn DocumentService,
        document_id: impl Into<String>,
        replacements: BTreeMap<String, String>,
    ) -> anyhow::Result<Self> {
        let document_id = document_id.into();
        let planned = plan_sentinels(&replacements)?;

        Ok(Self {
            service,
            report: SubstitutionReport {
                document_id: document_id.clone(),
                ..SubstitutionReport::default()
            },
            document_id,
            replacements,
            planned,
            state: RunState::Created,
            matches: Vec::new(),
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Runs all remaining phases in order.
    pub async fn run(&mut self) -> anyhow::Result<SubstitutionReport> {
        self.inject_sentinels().await?;
        self.discover_matches().await?;
        self.apply_patches().await
    }

    pub async fn inject_sentinels(&mut self) -> anyhow::Result<()> {
        self.expect_state(RunState::Created)?;

        let requests: Vec<Request> = self
            .planned
            .iter()
            .map(|planned| Request::replace_all(placeholder_for(&planned.key), &planned.sentinel))
            .collect();

        if !requests.is_empty() {
            tracing::info!(
                document_id = %self.document_id,
                placeholders = requests.len(),
                "inject sentinels"
            );
            let response = self
                .service
                .batch_update(&self.document_id, &requests)
                .await
                .with_context(|| format!("inject sentinels into document {}", self.document_id))?;

            for (idx, planned) in self.planned.iter_mut().enumerate() {
                planned.injected = response.occurrences_changed(idx);
            }
        }

        self.state = RunState::SentinelsInjected;
        Ok(())
    }

    pub async fn discover_matches(&mut self) -> anyhow::Result<&[PlaceholderMatch]> {
        self.expect_state(RunState::SentinelsInjected)?;

        let document = self
            .service
            .get_document(&self.document_id)
            .await
            .with_context(|| {
                format!(
                    "re-read document {} after sentinel injection",
                    self.document_id
                )
            })?;

        let by_sentinel: HashMap<&str, &PlannedKey> = self
            .planned
            .iter()
            .map(|planned| (planned.sentinel.as_str(), planned))
            .collect();

        let mut matches = Vec::new();
        let mut found_per_key: HashMap<&str, usize> = HashMap::new();
        for found in find_sentinels(&document) {
            let Some(planned) = by_sentinel.get(found.sentinel.as_str()) else {
                tracing::warn!(
                    document_id = %self.document_id,
                    sentinel = %found.sentinel,
                    start = found.start,
                    "sentinel has no replacement; leaving it in place"
                );
                self.report.unresolved.push(found.sentinel);
                continue;
            };
            *found_per_key.entry(planned.key.as_str()).or_default() += 1;
            matches.push(PlaceholderMatch {
                sentinel: found.sentinel,
                start: found.start,
                end: found.end,
                original_key: planned.key.clone(),
            });
        }

        for planned in &self.planned {
            let found = found_per_key.get(planned.key.as_str()).copied().unwrap_or(0);
            if let Some(injected) = planned.injected
                && found > injected
            {
                tracing::warn!(
                    document_id = %self.document_id,
                    sentinel = %planned.sentinel,
                    injected,
                    found,
                    "sentinel text also occurs in document content"
                );
                self.report.collisions.push(planned.sentinel.clone());
            }
        }

        tracing::info!(
            document_id = %self.document_id,
            matches = matches.len(),
            unresolved = self.report.unresolved.len(),
            "discovered sentinels"
        );
        self.matches = matches;
        self.state = RunState::MatchesDiscovered;
        Ok(&self.matches)
    }

    pub async fn apply_patches(&mut self) -> anyhow::Result<SubstitutionReport> {
        self.expect_state(RunState::MatchesDiscovered)?;

        let requests = patch_requests(&mut self.matches, &self.replacements);
        if requests.is_empty() {
            tracing::info!(document_id = %self.document_id, "no sentinels to patch");
        } else {
            tracing::info!(
                document_id = %self.document_id,
                matches = self.matches.len(),
                requests = requests.len(),
                "apply patches"
            );
            self.service
                .batch_update(&self.document_id, &requests)
                .await
                .with_context(|| format!("apply patches to document {}", self.document_id))?;
        }

        self.report.applied = std::mem::take(&mut self.matches);
        self.report.operations = requests.len();
        self.state = RunState::PatchesApplied;
        Ok(self.report.clone())
    }

    fn expect_state(&self, expected: RunState) -> anyhow::Result<()> {
        if self.state != expected {
            anyhow::bail!(
                "substitution for document {} is in state {:?}; expected {:?}",
                self.document_id,
                self.state,
                expected
            );
        }
        Ok(())
    }
}

/// Convenience wrapper: one complete run.
pub async fn substitute(
    service: &dyn DocumentService,
    document_id: &str,
    replacements: BTreeMap<String, String>,
) -> anyhow::Result<SubstitutionReport> {
    let mut run = Substitution::new(service, document_id, replacements)?;
    run.run().await
}

/// Phase 2 requests: for each match, highest offset first, delete the
/// sentinel and insert its compiled markdown at the same offset.
pub fn patch_requests(
    matches: &mut [PlaceholderMatch],
    replacements: &BTreeMap<String, String>,
) -> Vec<Request> {
    order_for_application(matches);

    let mut requests = Vec::new();
    for found in matches.iter() {
        let Some(markdown) = replacements.get(&found.original_key) else {
            continue;
        };
        requests.push(Request::delete_range(found.start, found.end));
        let patch = compile_markdown(markdown, found.start);
        requests.extend(patch.operations.into_iter().map(Request::from));
    }
    requests
}

fn plan_sentinels(replacements: &BTreeMap<String, String>) -> anyhow::Result<Vec<PlannedKey>> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    let mut planned = Vec::with_capacity(replacements.len());

    for key in replacements.keys() {
        let sentinel = sentinel_for(key);
        if sentinel.len() == SENTINEL_PREFIX.len() + SENTINEL_SUFFIX.len() {
            anyhow::bail!("placeholder key {key:?} has no alphanumeric characters");
        }
        if let Some(other) = owners.insert(sentinel.clone(), key) {
            anyhow::bail!("placeholder keys {other:?} and {key:?} both map to {sentinel}");
        }
        planned.push(PlannedKey {
            key: key.clone(),
            sentinel,
            injected: None,
        });
    }

    for (key, value) in replacements {
        if let Some(sentinel) = owners.keys().find(|sentinel| value.contains(sentinel.as_str())) {
            anyhow::bail!("replacement for {key:?} contains sentinel text {sentinel}");
        }
    }

    Ok(planned)
}
