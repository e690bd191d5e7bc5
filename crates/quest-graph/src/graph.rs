//! Requirement graph index using petgraph.
//!
//! Nodes are positions in the caller's task slice; edges run from a required
//! task to the task that depends on it. Only requirements whose status implies
//! completion or activity produce an edge. The index is rebuilt per engine
//! call rather than maintained incrementally.

use crate::Task;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use tracing::debug;

/// O(1) lookups over a flat task list plus the reverse "required-by" adjacency.
#[derive(Debug, Clone)]
pub struct TaskGraphIndex<'a> {
    /// The task list, in caller order. Node `i` is `tasks[i]`.
    tasks: &'a [Task],
    /// Required task -> dependent task.
    graph: DiGraph<(), ()>,
    /// Map from task ids to node indices. Later duplicates win.
    id_to_node: HashMap<&'a str, NodeIndex>,
}

impl<'a> TaskGraphIndex<'a> {
    /// Build the index over `tasks`.
    #[must_use]
    pub fn new(tasks: &'a [Task]) -> Self {
        let mut graph = DiGraph::with_capacity(tasks.len(), tasks.len());
        let mut id_to_node = HashMap::with_capacity(tasks.len());

        for task in tasks {
            let node = graph.add_node(());
            id_to_node.insert(task.id.as_str(), node);
        }

        let mut edges_to_add = Vec::new();
        for (position, task) in tasks.iter().enumerate() {
            let dependent = NodeIndex::new(position);
            for requirement in &task.task_requirements {
                if !requirement.requires_completion_or_active() {
                    continue;
                }
                let Some(required_id) = requirement.task_id.as_deref() else {
                    continue;
                };
                if let Some(&required) = id_to_node.get(required_id) {
                    edges_to_add.push((required, dependent));
                } else {
                    debug!(
                        "Task '{}' requires unknown task '{}', skipping edge",
                        task.id, required_id
                    );
                }
            }
        }

        for (from, to) in edges_to_add {
            graph.update_edge(from, to, ());
        }

        debug!(
            "Indexed {} tasks with {} required-by edges",
            graph.node_count(),
            graph.edge_count()
        );

        Self {
            tasks,
            graph,
            id_to_node,
        }
    }

    /// The indexed task list.
    #[must_use]
    pub fn tasks(&self) -> &'a [Task] {
        self.tasks
    }

    /// Get a task by id.
    #[must_use]
    pub fn get(&self, task_id: &str) -> Option<&'a Task> {
        self.node_of(task_id).map(|node| self.task_at(node))
    }

    /// Check if a task exists in the index.
    #[must_use]
    pub fn contains(&self, task_id: &str) -> bool {
        self.id_to_node.contains_key(task_id)
    }

    /// Node index for a task id.
    #[must_use]
    pub fn node_of(&self, task_id: &str) -> Option<NodeIndex> {
        self.id_to_node.get(task_id).copied()
    }

    /// Task stored at a node.
    ///
    /// # Panics
    ///
    /// Panics if `node` did not come from this index.
    #[must_use]
    pub fn task_at(&self, node: NodeIndex) -> &'a Task {
        &self.tasks[node.index()]
    }

    /// Nodes of tasks that require `node` to be completed or active.
    pub fn dependents_of(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(node, Direction::Outgoing)
    }

    /// Ids of tasks that require `task_id` to be completed or active.
    pub fn dependents(&self, task_id: &str) -> impl Iterator<Item = &'a str> + '_ {
        self.node_of(task_id)
            .into_iter()
            .flat_map(move |node| self.dependents_of(node))
            .map(move |node| self.task_at(node).id.as_str())
    }

    /// Number of indexed tasks (including duplicates).
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of required-by edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
