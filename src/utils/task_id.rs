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

use std::fmt;

/// Separator embedded in every task id, chosen to not collide with
/// order ids or scene names (spec §3).
const SEPARATOR: &str = "_@@@_";

#[derive(Debug)]
pub struct TaskIdError {
    pub task_id: String,
    pub occurrences: usize,
}

impl fmt::Display for TaskIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "task id {:?} has {} occurrences of the separator, expected exactly 1",
            self.task_id, self.occurrences
        )
    }
}

pub fn encode(orderid: &str, scene: &str) -> String {
    format!("{}{}{}", orderid, SEPARATOR, scene)
}

/// Recovers `(orderid, scene)` from a task id. Fails instead of
/// panicking when the separator is missing or appears more than once
/// — the latter is the "separator collision" programming error called
/// out in spec §7; the status handler must swallow this for a single
/// update without crashing the loop.
pub fn decode(task_id: &str) -> Result<(String, String), TaskIdError> {
    let occurrences = task_id.matches(SEPARATOR).count();
    if occurrences != 1 {
        return Err(TaskIdError { task_id: task_id.to_string(), occurrences });
    }

    let idx = task_id.find(SEPARATOR).unwrap();
    let orderid = task_id[..idx].to_string();
    let scene = task_id[idx + SEPARATOR.len()..].to_string();
    Ok((orderid, scene))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_round_trips() {
        let id = encode("o1", "L8A");
        assert_eq!(id, "o1_@@@_L8A");
        assert_eq!(decode(&id).unwrap(), ("o1".to_string(), "L8A".to_string()));
    }

    #[test]
    fn decode_rejects_missing_separator() {
        assert!(decode("not-a-task-id").is_err());
    }

    #[test]
    fn decode_rejects_separator_collision() {
        // as if scene itself had contained the separator
        assert!(decode("o1_@@@_L8A_@@@_extra").is_err());
    }
}
