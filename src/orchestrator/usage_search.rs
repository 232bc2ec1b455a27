//! Deferred usage search.
//!
//! Global tools that need external usages of a symbol do not search inline;
//! they queue a [`PendingSearchRequest`] and the engine dispatches all queued
//! requests together in fixpoint rounds. A round must fully complete before
//! satisfaction is re-checked; requests whose processors are still
//! unsatisfied re-queue for the next round.

use std::sync::Mutex;

use crate::graph::{Entity, EntityId, SymbolGraph};

/// What to look for when searching a symbol's usages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    References,
    Implementations,
    Overrides,
}

/// Receives search results and decides when it has seen enough.
pub trait UsageProcessor: Send + Sync {
    /// Handle one usage. Returning false stops the feed for this processor
    /// within the current round.
    fn process(&self, usage: &Entity) -> bool;

    /// Checked once per round, after the whole round completed. An
    /// unsatisfied processor re-queues its request for another round.
    fn is_satisfied(&self) -> bool;
}

/// Executes one usage query, feeding results to the processor.
pub trait SearchService: Send + Sync {
    fn search(
        &self,
        graph: &SymbolGraph,
        symbol: EntityId,
        kind: QueryKind,
        processor: &dyn UsageProcessor,
    );
}

/// A queued usage query with the processors awaiting its results.
pub struct PendingSearchRequest {
    pub symbol: EntityId,
    pub kind: QueryKind,
    pub processors: Vec<std::sync::Arc<dyn UsageProcessor>>,
}

/// Queue of deferred searches, filled by global tools and drained round by
/// round.
#[derive(Default)]
pub struct SearchQueue {
    pending: Mutex<Vec<PendingSearchRequest>>,
}

impl SearchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, request: PendingSearchRequest) {
        self.pending.lock().expect("search queue lock").push(request);
    }

    pub fn drain(&self) -> Vec<PendingSearchRequest> {
        std::mem::take(&mut *self.pending.lock().expect("search queue lock"))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().expect("search queue lock").is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().expect("search queue lock").len()
    }
}

/// Search service answering reference queries from the symbol graph itself.
/// Implementation and override queries need host-side indexes and return
/// nothing here.
#[derive(Debug, Default)]
pub struct GraphSearchService;

impl SearchService for GraphSearchService {
    fn search(
        &self,
        graph: &SymbolGraph,
        symbol: EntityId,
        kind: QueryKind,
        processor: &dyn UsageProcessor,
    ) {
        if kind != QueryKind::References {
            return;
        }
        for usage_id in graph.references_to(symbol) {
            let Some(usage) = graph.entity(usage_id) else {
                continue;
            };
            if !usage.valid {
                continue;
            }
            if !processor.process(usage) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EntityKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingProcessor {
        seen: AtomicUsize,
        stop_after: usize,
    }

    impl UsageProcessor for CountingProcessor {
        fn process(&self, _usage: &Entity) -> bool {
            let seen = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
            seen < self.stop_after
        }

        fn is_satisfied(&self) -> bool {
            self.seen.load(Ordering::SeqCst) >= self.stop_after
        }
    }

    fn graph_with_usages(count: usize) -> (SymbolGraph, EntityId) {
        let mut graph = SymbolGraph::new();
        let target = graph.insert(EntityKind::Member, "target");
        for i in 0..count {
            let caller = graph.insert(EntityKind::Member, format!("caller{i}"));
            graph.add_reference(caller, target);
        }
        (graph, target)
    }

    #[test]
    fn graph_service_feeds_references() {
        let (graph, target) = graph_with_usages(3);
        let processor = CountingProcessor {
            seen: AtomicUsize::new(0),
            stop_after: usize::MAX,
        };
        GraphSearchService.search(&graph, target, QueryKind::References, &processor);
        assert_eq!(processor.seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn processor_false_stops_the_feed() {
        let (graph, target) = graph_with_usages(5);
        let processor = CountingProcessor {
            seen: AtomicUsize::new(0),
            stop_after: 2,
        };
        GraphSearchService.search(&graph, target, QueryKind::References, &processor);
        assert_eq!(processor.seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn invalid_usages_are_skipped() {
        let (mut graph, target) = graph_with_usages(2);
        let gone = graph.references_to(target)[0];
        graph.invalidate(gone);
        let processor = CountingProcessor {
            seen: AtomicUsize::new(0),
            stop_after: usize::MAX,
        };
        GraphSearchService.search(&graph, target, QueryKind::References, &processor);
        assert_eq!(processor.seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn queue_drains_all_pending() {
        let queue = SearchQueue::new();
        let (_, target) = graph_with_usages(0);
        assert!(queue.is_empty());
        queue.enqueue(PendingSearchRequest {
            symbol: target,
            kind: QueryKind::References,
            processors: vec![Arc::new(CountingProcessor {
                seen: AtomicUsize::new(0),
                stop_after: 1,
            })],
        });
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.is_empty());
    }
}
