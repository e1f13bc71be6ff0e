// The MIT License (MIT)
//
// Copyright (c) 2026 the project contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

use std::collections::HashMap;

use chrono::Utc;

/// `task_id -> started_at` for tasks the scheduler believes are
/// currently running. Sole writer: the status-update handler, which
/// runs on the subscriber loop (spec §3, §5) — so this type does not
/// need internal locking the way `TaskList`/`NodeList` in the teacher
/// crate did for their multi-writer use.
#[derive(Default)]
pub struct RunningSet {
    tasks: HashMap<String, i64>,
}

impl RunningSet {
    pub fn new() -> RunningSet {
        RunningSet { tasks: HashMap::new() }
    }

    /// Idempotent: a second `TASK_RUNNING` for the same id leaves the
    /// original timestamp untouched (spec §4.6, §8).
    pub fn mark_running(&mut self, task_id: &str) {
        self.tasks.entry(task_id.to_string()).or_insert_with(|| Utc::now().timestamp());
    }

    /// No-op, logged by the caller, if the id wasn't present.
    pub fn remove(&mut self, task_id: &str) -> bool {
        self.tasks.remove(task_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.tasks.contains_key(task_id)
    }

    /// Current cpu utilization estimate: running-task count times the
    /// per-task cpu requirement (spec §3's running-set invariant).
    pub fn cpu_utilization(&self, task_cpu: f64) -> f64 {
        self.tasks.len() as f64 * task_cpu
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_running_update_keeps_earlier_timestamp() {
        let mut set = RunningSet::new();
        set.mark_running("o1_@@@_L8A");
        let first_ts = *set.tasks.get("o1_@@@_L8A").unwrap();

        // Force a different wall-clock moment is unnecessary: the
        // invariant under test is that mark_running never overwrites
        // an existing entry, not that clocks differ.
        set.mark_running("o1_@@@_L8A");

        assert_eq!(set.len(), 1);
        assert_eq!(*set.tasks.get("o1_@@@_L8A").unwrap(), first_ts);
    }

    #[test]
    fn finished_for_unknown_id_is_a_noop() {
        let mut set = RunningSet::new();
        assert!(!set.remove("never-existed"));
        assert!(set.is_empty());
    }

    #[test]
    fn cpu_utilization_scales_with_task_cpu() {
        let mut set = RunningSet::new();
        set.mark_running("a");
        set.mark_running("b");
        assert_eq!(set.cpu_utilization(1.5), 3.0);
    }
}
