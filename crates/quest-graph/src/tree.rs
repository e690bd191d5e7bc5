//! Cycle-safe forest construction over parent/child display links.
//!
//! Parent/child data comes from the source dataset and may contain cycles.
//! Construction tracks the lineage of the current path and drops any
//! back-edge into it, then sweeps up tasks unreachable from a root in a
//! second pass so each task lands in the forest.

use crate::Task;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A node in the display forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode<'a> {
    /// The visible version of the task when available, otherwise the full one.
    pub task: &'a Task,
    /// Retained children in source order.
    pub children: Vec<TreeNode<'a>>,
    /// Whether the task itself passed the visibility filter.
    pub is_visible: bool,
}

impl TreeNode<'_> {
    /// Membership test over this node and its descendants.
    #[must_use]
    pub fn contains(&self, target_id: &str) -> bool {
        contains_task(self, target_id)
    }

    /// Ids of this node and all descendants, depth-first.
    #[must_use]
    pub fn task_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            ids.push(node.task.id.as_str());
            stack.extend(node.children.iter().rev());
        }
        ids
    }
}

/// A list of root nodes.
pub type Forest<'a> = Vec<TreeNode<'a>>;

/// Whether `target_id` appears anywhere in `node`'s subtree.
#[must_use]
pub fn contains_task(node: &TreeNode<'_>, target_id: &str) -> bool {
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        if node.task.id == target_id {
            return true;
        }
        stack.extend(&node.children);
    }
    false
}

// Deep hierarchies would overflow the default recursive drop.
impl Drop for TreeNode<'_> {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

struct ForestBuilder<'a> {
    all_by_id: HashMap<&'a str, &'a Task>,
    visible_by_id: HashMap<&'a str, &'a Task>,
}

/// A task whose children are still being built.
struct Frame<'a> {
    id: &'a str,
    task: &'a Task,
    next_child: usize,
    children: Vec<TreeNode<'a>>,
}

impl<'a> Frame<'a> {
    fn new(id: &'a str, task: &'a Task) -> Self {
        Self {
            id,
            task,
            next_child: 0,
            children: Vec::new(),
        }
    }
}

impl<'a> ForestBuilder<'a> {
    /// Build the node for `root_id`, or `None` if nothing in its subtree is
    /// visible.
    ///
    /// Post-order walk on an explicit stack. The stack is the current path, so
    /// a child already in `lineage` is a cyclic back-edge and is dropped.
    fn build(&self, root_id: &'a str) -> Option<TreeNode<'a>> {
        let root = *self.all_by_id.get(root_id)?;
        let mut lineage = HashSet::from([root_id]);
        let mut stack = vec![Frame::new(root_id, root)];

        while let Some(frame) = stack.last_mut() {
            let task = frame.task;
            if let Some(child_id) = task.children.get(frame.next_child) {
                frame.next_child += 1;
                let child_id = child_id.as_str();
                if lineage.contains(child_id) {
                    debug!("Dropping cyclic back-edge into '{}'", child_id);
                    continue;
                }
                if let Some(&child) = self.all_by_id.get(child_id) {
                    lineage.insert(child_id);
                    stack.push(Frame::new(child_id, child));
                }
                continue;
            }

            let Some(done) = stack.pop() else {
                break;
            };
            lineage.remove(done.id);
            let node = self.finish(done);
            match stack.last_mut() {
                Some(parent) => parent.children.extend(node),
                None => return node,
            }
        }
        None
    }

    /// Keep a node only if it is visible or has retained children.
    fn finish(&self, frame: Frame<'a>) -> Option<TreeNode<'a>> {
        let visible = self.visible_by_id.get(frame.id).copied();
        if visible.is_none() && frame.children.is_empty() {
            return None;
        }
        Some(TreeNode {
            task: visible.unwrap_or(frame.task),
            children: frame.children,
            is_visible: visible.is_some(),
        })
    }
}

fn mark_visited<'a>(node: &TreeNode<'a>, visited: &mut HashSet<&'a str>) {
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        visited.insert(node.task.id.as_str());
        stack.extend(&node.children);
    }
}

/// Build the display forest.
///
/// `visible_tasks` is the filtered subset to show; its task objects are the
/// ones placed in the forest. Invisible tasks are kept only as connectors to
/// visible descendants.
#[must_use]
pub fn build_forest<'a>(all_tasks: &'a [Task], visible_tasks: &'a [Task]) -> Forest<'a> {
    let builder = ForestBuilder {
        all_by_id: all_tasks.iter().map(|t| (t.id.as_str(), t)).collect(),
        visible_by_id: visible_tasks.iter().map(|t| (t.id.as_str(), t)).collect(),
    };

    let has_parent: HashSet<&str> = all_tasks
        .iter()
        .filter(|task| {
            task.parents
                .iter()
                .any(|parent| builder.all_by_id.contains_key(parent.as_str()))
        })
        .map(|task| task.id.as_str())
        .collect();

    let mut forest = Vec::new();
    let mut visited = HashSet::new();

    for task in all_tasks {
        if has_parent.contains(task.id.as_str()) {
            continue;
        }
        if let Some(node) = builder.build(task.id.as_str()) {
            mark_visited(&node, &mut visited);
            forest.push(node);
        }
    }

    // Tasks whose only parents sit in a cycle never hang off a root.
    for task in all_tasks {
        if visited.contains(task.id.as_str()) {
            continue;
        }
        if let Some(node) = builder.build(task.id.as_str()) {
            mark_visited(&node, &mut visited);
            forest.push(node);
        }
    }

    debug!(
        "Built forest with {} roots over {} visible of {} tasks",
        forest.len(),
        visible_tasks.len(),
        all_tasks.len()
    );

    forest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, parents: &[&str], children: &[&str]) -> Task {
        Task {
            parents: parents.iter().map(|s| (*s).to_string()).collect(),
            children: children.iter().map(|s| (*s).to_string()).collect(),
            ..Task::new(id)
        }
    }

    fn count(forest: &Forest<'_>, id: &str) -> usize {
        forest
            .iter()
            .flat_map(TreeNode::task_ids)
            .filter(|found| *found == id)
            .count()
    }

    #[test]
    fn test_simple_hierarchy() {
        let tasks = vec![task("a", &[], &["b"]), task("b", &["a"], &["c"]), task("c", &["b"], &[])];
        let forest = build_forest(&tasks, &tasks);

        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].task.id, "a");
        assert_eq!(forest[0].children[0].task.id, "b");
        assert_eq!(forest[0].children[0].children[0].task.id, "c");
        assert!(forest[0].is_visible);
    }

    #[test]
    fn test_two_node_cycle_terminates() {
        let tasks = vec![task("a", &["b"], &["b"]), task("b", &["a"], &["a"])];
        let forest = build_forest(&tasks, &tasks);

        assert_eq!(forest.len(), 1);
        assert_eq!(count(&forest, "a"), 1);
        assert_eq!(count(&forest, "b"), 1);
    }

    #[test]
    fn test_self_loop() {
        let tasks = vec![task("a", &["a"], &["a"])];
        let forest = build_forest(&tasks, &tasks);
        assert_eq!(forest.len(), 1);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn test_cycle_hanging_off_root_is_broken() {
        let tasks = vec![
            task("root", &[], &["x"]),
            task("x", &["root", "y"], &["y"]),
            task("y", &["x"], &["x"]),
        ];
        let forest = build_forest(&tasks, &tasks);

        assert_eq!(forest.len(), 1);
        assert_eq!(count(&forest, "x"), 1);
        assert_eq!(count(&forest, "y"), 1);
    }

    #[test]
    fn test_invisible_leaves_are_pruned() {
        let tasks = vec![task("a", &[], &["b", "c"]), task("b", &["a"], &[]), task("c", &["a"], &[])];
        let visible = vec![tasks[1].clone()];
        let forest = build_forest(&tasks, &visible);

        assert_eq!(forest.len(), 1);
        assert!(!forest[0].is_visible);
        assert_eq!(forest[0].children.len(), 1);
        assert_eq!(forest[0].children[0].task.id, "b");
        assert!(forest[0].children[0].is_visible);
    }

    #[test]
    fn test_nothing_visible_yields_empty_forest() {
        let tasks = vec![task("a", &[], &["b"]), task("b", &["a"], &[])];
        assert!(build_forest(&tasks, &[]).is_empty());
    }

    #[test]
    fn test_visible_version_is_displayed() {
        let tasks = vec![task("a", &[], &[])];
        let mut hydrated = tasks[0].clone();
        hydrated.name = "Hydrated".to_string();
        let visible = vec![hydrated];

        let forest = build_forest(&tasks, &visible);
        assert_eq!(forest[0].task.name, "Hydrated");
    }

    #[test]
    fn test_parent_outside_list_makes_root() {
        let tasks = vec![task("a", &["missing"], &[])];
        let forest = build_forest(&tasks, &tasks);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].task.id, "a");
    }

    #[test]
    fn test_unknown_child_is_skipped() {
        let tasks = vec![task("a", &[], &["ghost"])];
        let forest = build_forest(&tasks, &tasks);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn test_roots_keep_source_order() {
        let tasks = vec![task("z", &[], &[]), task("m", &[], &[]), task("a", &[], &[])];
        let forest = build_forest(&tasks, &tasks);
        let roots: Vec<_> = forest.iter().map(|n| n.task.id.as_str()).collect();
        assert_eq!(roots, vec!["z", "m", "a"]);
    }

    #[test]
    fn test_contains_task() {
        let tasks = vec![task("a", &[], &["b"]), task("b", &["a"], &[])];
        let forest = build_forest(&tasks, &tasks);
        assert!(contains_task(&forest[0], "b"));
        assert!(forest[0].contains("a"));
        assert!(!contains_task(&forest[0], "c"));
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        const DEPTH: usize = 10_000;
        let tasks: Vec<Task> = (0..DEPTH)
            .map(|i| {
                let id = format!("t{i}");
                let parents: Vec<String> =
                    (i > 0).then(|| format!("t{}", i - 1)).into_iter().collect();
                let children: Vec<String> =
                    (i + 1 < DEPTH).then(|| format!("t{}", i + 1)).into_iter().collect();
                Task {
                    parents,
                    children,
                    ..Task::new(id)
                }
            })
            .collect();

        let forest = build_forest(&tasks, &tasks);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].task_ids().len(), DEPTH);
        assert!(contains_task(&forest[0], "t9999"));
        assert!(!contains_task(&forest[0], "t10000"));
    }

    #[test]
    fn test_deep_cycle_is_broken_once() {
        const DEPTH: usize = 5_000;
        let tasks: Vec<Task> = (0..DEPTH)
            .map(|i| {
                let next = format!("t{}", (i + 1) % DEPTH);
                let prev = format!("t{}", (i + DEPTH - 1) % DEPTH);
                task(&format!("t{i}"), &[prev.as_str()], &[next.as_str()])
            })
            .collect();

        let forest = build_forest(&tasks, &tasks);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].task_ids().len(), DEPTH);
    }
}
