//! Deterministic task sampling.
//!
//! Sampling is a seeded shuffle of the full index range followed by taking
//! the first K indices. The selection is re-sorted ascending before tasks
//! are materialized so reports list tasks in dataset order.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::dataset::Task;

/// Seeded task sampler. Same seed and count always yield the same subset.
#[derive(Debug, Clone, Copy)]
pub struct TaskSampler {
    seed: u64,
}

impl TaskSampler {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Sample `count` tasks from the pool. `count` saturates silently at the
    /// pool size.
    pub fn sample(&self, tasks: &[Task], count: usize) -> Vec<Task> {
        if tasks.is_empty() || count == 0 {
            return Vec::new();
        }

        let count = count.min(tasks.len());
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut indices: Vec<usize> = (0..tasks.len()).collect();
        indices.shuffle(&mut rng);
        indices.truncate(count);
        indices.sort_unstable();

        indices.into_iter().map(|i| tasks[i].clone()).collect()
    }

    /// Select the tasks whose IDs appear in the allowlist, preserving
    /// dataset order. IDs absent from the dataset are logged and skipped.
    pub fn select(&self, tasks: &[Task], ids: &[String]) -> Vec<Task> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let selected: Vec<Task> = tasks
            .iter()
            .filter(|t| wanted.contains(t.id.as_str()))
            .cloned()
            .collect();

        if selected.len() < wanted.len() {
            let found: HashSet<&str> = selected.iter().map(|t| t.id.as_str()).collect();
            let missing: Vec<&str> = wanted.difference(&found).copied().collect();
            tracing::warn!(?missing, "Requested task IDs not present in dataset");
        }

        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tasks(n: usize) -> Vec<Task> {
        (0..n)
            .map(|i| Task {
                id: format!("task-{i}"),
                prompt: format!("prompt {i}"),
                hidden_test: None,
                entry_point: None,
            })
            .collect()
    }

    #[test]
    fn same_seed_same_subset() {
        let tasks = make_tasks(20);
        let a = TaskSampler::new(42).sample(&tasks, 5);
        let b = TaskSampler::new(42).sample(&tasks, 5);
        let ids_a: Vec<&str> = a.iter().map(|t| t.id.as_str()).collect();
        let ids_b: Vec<&str> = b.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn different_seed_usually_differs() {
        let tasks = make_tasks(50);
        let a = TaskSampler::new(1).sample(&tasks, 10);
        let b = TaskSampler::new(2).sample(&tasks, 10);
        let ids_a: Vec<&str> = a.iter().map(|t| t.id.as_str()).collect();
        let ids_b: Vec<&str> = b.iter().map(|t| t.id.as_str()).collect();
        assert_ne!(ids_a, ids_b);
    }

    #[test]
    fn selection_is_sorted_by_dataset_order() {
        let tasks = make_tasks(30);
        let sampled = TaskSampler::new(7).sample(&tasks, 10);
        let positions: Vec<usize> = sampled
            .iter()
            .map(|t| {
                t.id.strip_prefix("task-")
                    .and_then(|s| s.parse().ok())
                    .unwrap()
            })
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn count_saturates_at_pool_size() {
        let tasks = make_tasks(3);
        let sampled = TaskSampler::new(42).sample(&tasks, 100);
        assert_eq!(sampled.len(), 3);
    }

    #[test]
    fn allowlist_overrides_count() {
        let tasks = make_tasks(10);
        let ids = vec!["task-7".to_string(), "task-2".to_string()];
        let selected = TaskSampler::new(42).select(&tasks, &ids);
        let got: Vec<&str> = selected.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(got, vec!["task-2", "task-7"]);
    }

    #[test]
    fn unknown_ids_are_skipped() {
        let tasks = make_tasks(3);
        let ids = vec!["task-1".to_string(), "task-99".to_string()];
        let selected = TaskSampler::new(42).select(&tasks, &ids);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "task-1");
    }
}
