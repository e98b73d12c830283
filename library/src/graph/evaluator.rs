//! Dirty bookkeeping and the per-pass execution loop.

use std::collections::{HashMap, HashSet};

use log::{debug, error};
use uuid::Uuid;

use crate::error::GraphError;
use crate::graph::Graph;
use crate::graph::analysis;
use crate::graph::context::EvaluationContext;
use crate::model::pin_value::PinValue;

/// Evaluation state carried between passes.
pub(crate) struct Evaluator {
    /// Nodes awaiting evaluation.
    dirty: HashSet<Uuid>,
    /// Marks raised during the current pass; promoted when the pass ends.
    deferred: HashSet<Uuid>,
    /// Cached topological order, dropped on any structural change.
    order_cache: Option<Vec<Uuid>>,
}

impl Evaluator {
    pub(crate) fn new() -> Self {
        Self {
            dirty: HashSet::new(),
            deferred: HashSet::new(),
            order_cache: None,
        }
    }

    pub(crate) fn mark(&mut self, id: Uuid) {
        self.dirty.insert(id);
    }

    pub(crate) fn is_marked(&self, id: Uuid) -> bool {
        self.dirty.contains(&id)
    }

    pub(crate) fn has_marks(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub(crate) fn take_dirty(&mut self) -> HashSet<Uuid> {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn defer(&mut self, id: Uuid) {
        self.deferred.insert(id);
    }

    pub(crate) fn drain_deferred(&mut self) -> Vec<Uuid> {
        self.deferred.drain().collect()
    }

    pub(crate) fn forget(&mut self, id: Uuid) {
        self.dirty.remove(&id);
        self.deferred.remove(&id);
    }

    pub(crate) fn invalidate_order(&mut self) {
        self.order_cache = None;
    }

    pub(crate) fn cached_order(&self) -> Option<Vec<Uuid>> {
        self.order_cache.clone()
    }

    pub(crate) fn store_order(&mut self, order: Vec<Uuid>) {
        self.order_cache = Some(order);
    }
}

/// Result of one evaluation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    /// Nodes whose behavior ran.
    pub evaluated: usize,
    /// Nodes whose behavior returned an error.
    pub failed: usize,
}

impl Graph {
    /// Run one evaluation pass.
    ///
    /// Dirty nodes run in topological order, each seeing upstream values
    /// already computed this pass. A failing node is isolated: its outputs
    /// reset to `PinValue::None`, the error is logged, and the pass moves on.
    /// Marks raised during the pass (via `EvaluationContext::mark_dirty`) are
    /// promoted afterwards so re-entrant nodes run next pass, never twice in
    /// one. Observers are notified once at the end.
    pub fn evaluate(&mut self) -> Result<PassSummary, GraphError> {
        let order = self.execution_order()?;
        let dirty = self.evaluator.take_dirty();
        let mut summary = PassSummary::default();

        if !dirty.is_empty() {
            debug!("Graph: evaluating {} dirty node(s)", dirty.len());
        }

        for id in order.into_iter().filter(|id| dirty.contains(id)) {
            summary.evaluated += 1;
            if !self.evaluate_node(id) {
                summary.failed += 1;
            }
        }

        for id in self.evaluator.drain_deferred() {
            self.mark_dirty(id);
        }

        self.trigger_change();
        Ok(summary)
    }

    fn execution_order(&mut self) -> Result<Vec<Uuid>, GraphError> {
        if let Some(order) = self.evaluator.cached_order() {
            return Ok(order);
        }
        let order = analysis::topological_sort(self)?;
        self.evaluator.store_order(order.clone());
        Ok(order)
    }

    /// Evaluate a single node. Returns false if its behavior failed.
    fn evaluate_node(&mut self, id: Uuid) -> bool {
        let inputs = self.collect_inputs(id);
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        let behavior = node.behavior();
        let mut ctx = EvaluationContext::new(node, inputs);
        let result = behavior.evaluate(&mut ctx);
        let requested = ctx.dirty_requested();

        if requested {
            self.evaluator.defer(id);
        }

        match result {
            Ok(()) => {
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.set_dirty(false);
                }
                true
            }
            Err(err) => {
                if let Some(node) = self.nodes.get_mut(&id) {
                    error!(
                        "Graph: node '{}' ({}) failed to evaluate: {}",
                        node.label, node.type_id, err
                    );
                    node.clear_outputs();
                    node.set_dirty(false);
                }
                false
            }
        }
    }

    /// Resolve every incoming value for a node, in connection order.
    fn collect_inputs(&self, id: Uuid) -> HashMap<String, Vec<PinValue>> {
        let mut inputs: HashMap<String, Vec<PinValue>> = HashMap::new();
        for conn in &self.connections {
            if conn.to.node_id != id {
                continue;
            }
            let value = self
                .nodes
                .get(&conn.from.node_id)
                .map(|node| node.output_value(&conn.from.pin_name))
                .unwrap_or(PinValue::None);
            inputs
                .entry(conn.to.pin_name.clone())
                .or_default()
                .push(value);
        }
        inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::context::NodeEvaluator;
    use crate::graph::node::Node;
    use crate::model::connection::{PinDataType, PinDefinition};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counting {
        hits: Arc<AtomicU32>,
    }

    impl NodeEvaluator for Counting {
        fn evaluate(&self, ctx: &mut EvaluationContext) -> Result<(), GraphError> {
            let hits = self.hits.fetch_add(1, Ordering::SeqCst) + 1;
            ctx.set_output("out", PinValue::Scalar(hits as f64));
            Ok(())
        }
    }

    struct Ticking {
        hits: Arc<AtomicU32>,
    }

    impl NodeEvaluator for Ticking {
        fn evaluate(&self, ctx: &mut EvaluationContext) -> Result<(), GraphError> {
            let hits = self.hits.fetch_add(1, Ordering::SeqCst) + 1;
            ctx.set_output("out", PinValue::Scalar(hits as f64));
            ctx.mark_dirty();
            Ok(())
        }
    }

    struct Failing;

    impl NodeEvaluator for Failing {
        fn evaluate(&self, ctx: &mut EvaluationContext) -> Result<(), GraphError> {
            ctx.set_output("out", PinValue::Scalar(1.0));
            Err(GraphError::evaluation("broken on purpose"))
        }
    }

    fn node_with(behavior: Arc<dyn NodeEvaluator>, label: &str) -> Node {
        let mut node = Node::new(Uuid::new_v4(), "test.node", label, behavior);
        node.add_output(PinDefinition::output("out", "Out", PinDataType::Scalar));
        node.add_input(PinDefinition::input("in", "In", PinDataType::Scalar));
        node
    }

    #[test]
    fn test_pass_evaluates_only_dirty_nodes() {
        let hits_a = Arc::new(AtomicU32::new(0));
        let hits_b = Arc::new(AtomicU32::new(0));
        let mut graph = Graph::new();
        let a = graph
            .add_node(node_with(Arc::new(Counting { hits: Arc::clone(&hits_a) }), "a"))
            .expect("add a");
        let _b = graph
            .add_node(node_with(Arc::new(Counting { hits: Arc::clone(&hits_b) }), "b"))
            .expect("add b");

        let summary = graph.evaluate().expect("pass");
        assert_eq!(summary.evaluated, 2);
        assert_eq!(hits_a.load(Ordering::SeqCst), 1);
        assert_eq!(hits_b.load(Ordering::SeqCst), 1);

        let summary = graph.evaluate().expect("pass");
        assert_eq!(summary.evaluated, 0);

        graph.mark_dirty(a);
        let summary = graph.evaluate().expect("pass");
        assert_eq!(summary.evaluated, 1);
        assert_eq!(hits_a.load(Ordering::SeqCst), 2);
        assert_eq!(hits_b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_mark_raised_during_pass_defers_to_next() {
        let hits = Arc::new(AtomicU32::new(0));
        let mut graph = Graph::new();
        let id = graph
            .add_node(node_with(Arc::new(Ticking { hits: Arc::clone(&hits) }), "tick"))
            .expect("add");

        graph.evaluate().expect("pass");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(graph.needs_evaluation());
        assert!(graph.node(id).map(|n| n.is_dirty()).unwrap_or(false));

        graph.evaluate().expect("pass");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_node_is_isolated() {
        let hits = Arc::new(AtomicU32::new(0));
        let mut graph = Graph::new();
        let bad = graph
            .add_node(node_with(Arc::new(Failing), "bad"))
            .expect("add bad");
        let good = graph
            .add_node(node_with(Arc::new(Counting { hits: Arc::clone(&hits) }), "good"))
            .expect("add good");

        let summary = graph.evaluate().expect("pass");
        assert_eq!(summary.evaluated, 2);
        assert_eq!(summary.failed, 1);

        // failed node: outputs wiped, flag cleared, no retry without a new mark
        assert_eq!(graph.output_value(bad, "out"), PinValue::None);
        assert!(!graph.node(bad).map(|n| n.is_dirty()).unwrap_or(true));
        assert_eq!(graph.output_value(good, "out"), PinValue::Scalar(1.0));

        let summary = graph.evaluate().expect("pass");
        assert_eq!(summary.evaluated, 0);
    }
}
