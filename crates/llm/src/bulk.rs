use futures::future::join_all;
use precis_common::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::cache::Fingerprint;
use crate::service::SummaryService;
use crate::types::Summary;

/// One entry of a bulk request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl BatchItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            text: Some(text.into()),
        }
    }
}

/// Items sharing a fingerprint; summarized once
struct BatchGroup {
    fingerprint: Fingerprint,
    source: String,
    ids: Vec<String>,
}

/// Fans a batch out over the summary pipeline behind a global concurrency gate
///
/// The gate is shared by every batch handled by the owning service, so the
/// ceiling holds across concurrent bulk requests. Cache hits never take a permit.
pub struct BulkDispatcher {
    gate: Arc<Semaphore>,
    concurrency: usize,
}

impl BulkDispatcher {
    pub fn new(concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            gate: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Permits not currently held by a round trip
    pub fn available_permits(&self) -> usize {
        self.gate.available_permits()
    }

    /// Summarize every valid item, keyed by id
    ///
    /// Items without an id or with blank text are skipped. Identical inputs
    /// share one pipeline run. A failed group is logged and left out of the
    /// result; the remaining groups are unaffected.
    pub async fn summarize_batch(&self, service: &SummaryService, items: Vec<BatchItem>) -> HashMap<String, Summary> {
        let total = items.len();
        let (groups, skipped) = group_items(service, items);

        info!(
            "Bulk request - Items: {}, Distinct: {}, Skipped: {}",
            total,
            groups.len(),
            skipped
        );

        let outcomes = join_all(groups.into_iter().map(|group| async move {
            let result = self.run_group(service, &group.fingerprint, group.source).await;
            (group.fingerprint, group.ids, result)
        }))
        .await;

        let mut summaries = HashMap::new();
        for (fingerprint, ids, result) in outcomes {
            match result {
                Ok(summary) => {
                    for id in ids {
                        summaries.insert(id, summary.clone());
                    }
                }
                Err(e) => {
                    warn!(
                        "Bulk item failed, omitting {} id(s) - Fingerprint: {}, Error: {}",
                        ids.len(),
                        fingerprint.short(),
                        e
                    );
                }
            }
        }

        info!("Bulk request complete - Summaries: {}/{}", summaries.len(), total);
        summaries
    }

    async fn run_group(&self, service: &SummaryService, fingerprint: &Fingerprint, source: String) -> Result<Summary> {
        service
            .summarize_prepared(fingerprint, source, Some(Arc::clone(&self.gate)))
            .await
    }
}

/// Resolve repeated ids (last occurrence wins), then group by fingerprint
fn group_items(service: &SummaryService, items: Vec<BatchItem>) -> (Vec<BatchGroup>, usize) {
    let mut latest: Vec<(String, Option<String>)> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0;

    for item in items {
        let Some(id) = item.id.filter(|id| !id.trim().is_empty()) else {
            skipped += 1;
            continue;
        };
        match slots.get(&id) {
            Some(&slot) => {
                debug!("Bulk id repeated, keeping last occurrence: {}", id);
                latest[slot].1 = item.text;
                skipped += 1;
            }
            None => {
                slots.insert(id.clone(), latest.len());
                latest.push((id, item.text));
            }
        }
    }

    let mut groups: Vec<BatchGroup> = Vec::new();
    let mut index: HashMap<Fingerprint, usize> = HashMap::new();

    for (id, text) in latest {
        let source = match service.prepare(text.as_deref().unwrap_or_default()) {
            Ok(source) => source,
            Err(_) => {
                debug!("Skipping bulk item without text: {}", id);
                skipped += 1;
                continue;
            }
        };

        let fingerprint = service.fingerprint(&source);
        match index.get(&fingerprint) {
            Some(&slot) => groups[slot].ids.push(id),
            None => {
                index.insert(fingerprint.clone(), groups.len());
                groups.push(BatchGroup {
                    fingerprint,
                    source,
                    ids: vec![id],
                });
            }
        }
    }

    (groups, skipped)
}
