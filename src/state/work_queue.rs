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

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::collaborator::order_api::WorkUnit;

/// Bounded FIFO of pending work units. One producer (the refill job),
/// one consumer (the offer handler); both non-blocking.
///
/// The soft cap is checked by callers before a batch is requested, not
/// enforced strictly here — `put_nowait` only refuses once `q_max` is
/// already reached, so a single refill batch can push the queue past
/// its cap by up to `product_request_count - 1`. That's intentional,
/// see spec §4.2.
pub struct WorkQueue {
    queue: Mutex<VecDeque<WorkUnit>>,
    q_max: usize,
}

/// Carries the rejected unit back to the caller — enqueue never
/// silently drops work, it's the caller's decision what to do with a
/// unit that didn't fit (spec §7: logged, then dropped).
#[derive(Debug, PartialEq, Eq)]
pub struct QueueFull(pub WorkUnit);

impl WorkQueue {
    pub fn new(q_max: usize) -> WorkQueue {
        WorkQueue {
            queue: Mutex::new(VecDeque::new()),
            q_max,
        }
    }

    /// Non-blocking enqueue. Returns `Err(QueueFull)` without dropping
    /// the unit's ownership back to the caller when the soft cap is
    /// already reached.
    pub fn put_nowait(&self, unit: WorkUnit) -> Result<(), QueueFull> {
        let mut queue = self.queue.lock().unwrap();
        if queue.len() >= self.q_max {
            return Err(QueueFull(unit));
        }
        queue.push_back(unit);
        Ok(())
    }

    /// Non-blocking dequeue. `None` when drained.
    pub fn get_nowait(&self) -> Option<WorkUnit> {
        self.queue.lock().unwrap().pop_front()
    }

    /// Approximate size. Racy under concurrency by design (spec §4.2,
    /// §9: "a soft guardrail, not a strict cap").
    pub fn qsize(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(orderid: &str, scene: &str) -> WorkUnit {
        WorkUnit {
            orderid: orderid.to_string(),
            scene: scene.to_string(),
        }
    }

    #[test]
    fn enqueue_dequeue_is_fifo() {
        let q = WorkQueue::new(10);
        q.put_nowait(unit("o1", "a")).unwrap();
        q.put_nowait(unit("o2", "b")).unwrap();

        assert_eq!(q.get_nowait().unwrap().orderid, "o1");
        assert_eq!(q.get_nowait().unwrap().orderid, "o2");
        assert!(q.get_nowait().is_none());
    }

    #[test]
    fn put_nowait_reports_full_without_dropping() {
        let q = WorkQueue::new(1);
        q.put_nowait(unit("o1", "a")).unwrap();
        let result = q.put_nowait(unit("o2", "b"));
        assert_eq!(result, Err(QueueFull(unit("o2", "b"))));
        assert_eq!(q.qsize(), 1);
    }

    #[test]
    fn get_nowait_on_empty_queue_returns_none() {
        let q = WorkQueue::new(10);
        assert!(q.get_nowait().is_none());
    }
}
