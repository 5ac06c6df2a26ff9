//! Asynchronous enrichment of node descriptions.
//!
//! Elaboration is synchronous and produces a complete, described tree. An
//! [`Enricher`] may then add free text to nodes (for example a trend summary
//! from an external service). The pass only produces [`EnrichmentPatch`]es;
//! they are applied with [`apply_patch`], which discards patches computed for
//! an older generation of the tree.
//!
//! ```ignore
//! let token = CancellationToken::new();
//! let patches = enrich_tree(&tree, &service, &cache, &token).await;
//! apply_patches(&mut tree, patches);
//! ```

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::logging::{PerfSpan, span_names, targets};
use crate::tree::{ElaboratedTree, NodeType};
use crate::value::Datum;

/// Error reported by an [`Enricher`]. Never fatal to the tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnrichError {
    /// The backing service could not be reached.
    #[error("Enrichment service unavailable: {0}")]
    Unavailable(String),

    #[error("Enrichment failed: {0}")]
    Failed(String),
}

/// What an enricher sees of one node.
#[derive(Debug, Clone)]
pub struct EnrichmentRequest<'a> {
    pub id: &'a str,
    pub node_type: NodeType,
    /// Token text of the node, already composed.
    pub description: String,
    /// The node's live selection.
    pub rows: Vec<&'a Datum>,
}

/// Source of extra description text.
#[allow(async_fn_in_trait)]
pub trait Enricher {
    /// Text to append to the node's description, or `None` for nothing.
    async fn enrich(&self, request: &EnrichmentRequest<'_>) -> Result<Option<String>, EnrichError>;
}

/// Extra text for one node of one tree generation.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentPatch {
    pub generation: u64,
    pub id: String,
    pub text: String,
}

/// A cancellation flag shared between the embedder and an enrichment pass.
///
/// The pass checks the flag between nodes.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Reset the token so it can be reused for another pass.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}

/// In-memory cache of enrichment text, keyed by node type and a hash of the
/// serialized selected rows.
#[derive(Debug, Default)]
pub struct EnrichmentCache {
    entries: Mutex<HashMap<u64, Option<String>>>,
}

impl EnrichmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for a node type and its selection.
    pub fn key(node_type: NodeType, rows: &[&Datum]) -> u64 {
        let mut hasher = DefaultHasher::new();
        node_type.hash(&mut hasher);
        match serde_json::to_string(rows) {
            Ok(serialized) => serialized.hash(&mut hasher),
            Err(_) => rows.len().hash(&mut hasher),
        }
        hasher.finish()
    }

    pub fn get(&self, key: u64) -> Option<Option<String>> {
        self.entries.lock().get(&key).cloned()
    }

    pub fn insert(&self, key: u64, text: Option<String>) {
        self.entries.lock().insert(key, text);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Run `enricher` over every node of `tree`, in pre-order.
///
/// Failed nodes are logged and skipped. Cached results, including cached
/// "nothing to add", are reused without calling the enricher. The pass stops
/// between nodes once `token` is cancelled and returns what it has so far.
pub async fn enrich_tree<E: Enricher>(
    tree: &ElaboratedTree,
    enricher: &E,
    cache: &EnrichmentCache,
    token: &CancellationToken,
) -> Vec<EnrichmentPatch> {
    let _perf = PerfSpan::new(span_names::ENRICH);
    let generation = tree.generation();
    let mut patches = Vec::new();

    for (index, node) in tree.iter() {
        if token.is_cancelled() {
            tracing::debug!(
                target: targets::ENRICH,
                generation,
                completed = patches.len(),
                "enrichment cancelled"
            );
            break;
        }

        let rows = tree.selection(index);
        let key = EnrichmentCache::key(node.node_type, &rows);
        let text = match cache.get(key) {
            Some(cached) => cached,
            None => {
                let request = EnrichmentRequest {
                    id: &node.id,
                    node_type: node.node_type,
                    description: tree.description_text(index),
                    rows,
                };
                match enricher.enrich(&request).await {
                    Ok(text) => {
                        cache.insert(key, text.clone());
                        text
                    }
                    Err(e) => {
                        tracing::debug!(target: targets::ENRICH, id = %node.id, error = %e, "enrichment failed");
                        None
                    }
                }
            }
        };

        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            patches.push(EnrichmentPatch {
                generation,
                id: node.id.clone(),
                text,
            });
        }
    }

    tracing::debug!(target: targets::ENRICH, generation, patches = patches.len(), "enrichment pass finished");
    patches
}

/// Apply one patch. Returns `false` when it is stale or names no node.
pub fn apply_patch(tree: &mut ElaboratedTree, patch: EnrichmentPatch) -> bool {
    if patch.generation != tree.generation() {
        tracing::debug!(
            target: targets::ENRICH,
            patch_generation = patch.generation,
            tree_generation = tree.generation(),
            "discarding stale enrichment"
        );
        return false;
    }
    let Some(index) = tree.find_by_id(&patch.id) else {
        return false;
    };
    match tree.get_mut(index) {
        Some(node) => {
            node.enrichment = Some(patch.text);
            true
        }
        None => false,
    }
}

/// Apply patches, returning how many were applied.
pub fn apply_patches(tree: &mut ElaboratedTree, patches: impl IntoIterator<Item = EnrichmentPatch>) -> usize {
    patches
        .into_iter()
        .map(|patch| apply_patch(tree, patch))
        .filter(|&applied| applied)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{OlliNode, OlliSpec, UnitSpec};
    use crate::tree::{ElaborateOptions, elaborate_tree};
    use crate::value::Value;
    use std::sync::atomic::AtomicUsize;

    fn tree() -> ElaboratedTree {
        let data: Vec<Datum> = [("a", 1.0), ("b", 2.0), ("a", 3.0)]
            .iter()
            .map(|(x, y)| {
                Datum::from([
                    ("x".to_string(), Value::from(*x)),
                    ("y".to_string(), Value::from(*y)),
                ])
            })
            .collect();
        let mut unit = UnitSpec::new(data);
        unit.structure = Some(vec![OlliNode::group("x")]);
        elaborate_tree(&OlliSpec::Unit(unit), &ElaborateOptions::default()).unwrap()
    }

    /// Describes the row count of data nodes; fails on the root.
    struct CountingEnricher {
        calls: AtomicUsize,
    }

    impl Enricher for CountingEnricher {
        async fn enrich(&self, request: &EnrichmentRequest<'_>) -> Result<Option<String>, EnrichError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match request.node_type {
                NodeType::Root => Err(EnrichError::Unavailable("offline".into())),
                _ => Ok(Some(format!("{} rows", request.rows.len()))),
            }
        }
    }

    struct CancellingEnricher {
        token: CancellationToken,
    }

    impl Enricher for CancellingEnricher {
        async fn enrich(&self, _request: &EnrichmentRequest<'_>) -> Result<Option<String>, EnrichError> {
            self.token.cancel();
            Ok(Some("first".into()))
        }
    }

    #[test]
    fn test_failures_are_omitted() {
        let tree = tree();
        let enricher = CountingEnricher {
            calls: AtomicUsize::new(0),
        };
        let patches = pollster::block_on(enrich_tree(
            &tree,
            &enricher,
            &EnrichmentCache::new(),
            &CancellationToken::new(),
        ));
        let ids: Vec<&str> = patches.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["olli-0", "olli-1"]);
        assert_eq!(patches[0].text, "2 rows");
        assert!(patches.iter().all(|p| p.generation == tree.generation()));
    }

    #[test]
    fn test_cache_skips_second_call() {
        let tree = tree();
        let enricher = CountingEnricher {
            calls: AtomicUsize::new(0),
        };
        let cache = EnrichmentCache::new();
        let token = CancellationToken::new();
        pollster::block_on(enrich_tree(&tree, &enricher, &cache, &token));
        let first = enricher.calls.load(Ordering::SeqCst);
        let patches = pollster::block_on(enrich_tree(&tree, &enricher, &cache, &token));
        // The failed root is not cached and is asked again.
        assert_eq!(enricher.calls.load(Ordering::SeqCst), first + 1);
        assert_eq!(patches.len(), 2);
    }

    #[test]
    fn test_cancellation_stops_between_nodes() {
        let tree = tree();
        let token = CancellationToken::new();
        let enricher = CancellingEnricher {
            token: token.clone(),
        };
        let patches = pollster::block_on(enrich_tree(
            &tree,
            &enricher,
            &EnrichmentCache::new(),
            &token,
        ));
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].id, "olli");
        token.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_stale_patch_is_discarded() {
        let mut old = tree();
        let mut new = tree();
        assert!(new.generation() > old.generation());

        let patch = EnrichmentPatch {
            generation: old.generation(),
            id: "olli-0".into(),
            text: "rising".into(),
        };
        assert!(!apply_patch(&mut new, patch.clone()));
        assert!(apply_patch(&mut old, patch));

        let a = old.find_by_id("olli-0").unwrap();
        assert!(old.description_text(a).ends_with("Rising."));
        assert!(new.get(a).unwrap().enrichment.is_none());
    }

    #[test]
    fn test_cache_key_depends_on_rows() {
        let tree = tree();
        let root = tree.root();
        let a = tree.children(root)[0];
        let b = tree.children(root)[1];
        let key_a = EnrichmentCache::key(NodeType::FilteredData, &tree.selection(a));
        let key_b = EnrichmentCache::key(NodeType::FilteredData, &tree.selection(b));
        assert_ne!(key_a, key_b);
        assert_eq!(
            key_a,
            EnrichmentCache::key(NodeType::FilteredData, &tree.selection(a))
        );
    }
}
