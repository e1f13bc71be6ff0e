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

/// A single named scalar resource, the shape an offer's resource list
/// comes in over the wire (mirrors `resource.get_name()` /
/// `resource.get_scalar().get_value()` in the teacher crate's
/// `scheduler_impl.rs::offers`).
#[derive(Clone, Debug, PartialEq)]
pub struct NamedScalar {
    pub name: String,
    pub value: f64,
}

/// Returns `0.0` when `name` is absent (spec §4.4).
pub fn get(resources: &[NamedScalar], name: &str) -> f64 {
    resources
        .iter()
        .find(|r| r.name == name)
        .map(|r| r.value)
        .unwrap_or(0.0)
}

/// Subtracts `v` in place; no-op when `v <= 0.0` (spec §4.4).
pub fn deduct(resources: &mut [NamedScalar], name: &str, v: f64) {
    if v <= 0.0 {
        return;
    }
    if let Some(r) = resources.iter_mut().find(|r| r.name == name) {
        r.value -= v;
    }
}

/// Checks cpu, then mem, then disk against `resources`. A zero
/// requirement disables that dimension (spec §8). Ties accept. On
/// success, deducts all three requirements from `resources` in place
/// and returns `true`; on failure, `resources` is left untouched.
pub fn fits_and_deduct(resources: &mut Vec<NamedScalar>, cpu_req: f64, mem_req: f64, disk_req: f64) -> bool {
    if cpu_req > 0.0 && cpu_req > get(resources, "cpus") {
        return false;
    }
    if mem_req > 0.0 && mem_req > get(resources, "mem") {
        return false;
    }
    if disk_req > 0.0 && disk_req > get(resources, "disk") {
        return false;
    }

    deduct(resources, "cpus", cpu_req);
    deduct(resources, "mem", mem_req);
    deduct(resources, "disk", disk_req);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(cpu: f64, mem: f64, disk: f64) -> Vec<NamedScalar> {
        vec![
            NamedScalar { name: "cpus".into(), value: cpu },
            NamedScalar { name: "mem".into(), value: mem },
            NamedScalar { name: "disk".into(), value: disk },
        ]
    }

    #[test]
    fn get_returns_zero_for_absent_name() {
        let resources = offer(4.0, 1024.0, 2048.0);
        assert_eq!(get(&resources, "gpus"), 0.0);
    }

    #[test]
    fn exact_cpu_match_passes_fit_check() {
        let mut resources = offer(1.0, 5120.0, 10240.0);
        assert!(fits_and_deduct(&mut resources, 1.0, 5120.0, 10240.0));
        assert_eq!(get(&resources, "cpus"), 0.0);
        assert_eq!(get(&resources, "mem"), 0.0);
        assert_eq!(get(&resources, "disk"), 0.0);
    }

    #[test]
    fn zero_requirement_disables_dimension() {
        let mut resources = offer(0.5, 0.0, 0.0);
        assert!(fits_and_deduct(&mut resources, 0.0, 0.0, 0.0));
    }

    #[test]
    fn insufficient_cpu_declines_and_does_not_mutate() {
        let mut resources = offer(0.5, 10240.0, 10240.0);
        assert!(!fits_and_deduct(&mut resources, 1.0, 5120.0, 10240.0));
        assert_eq!(get(&resources, "mem"), 10240.0);
    }

    #[test]
    fn checks_cpu_before_mem_before_disk() {
        // insufficient on all three dimensions; the function should
        // still just return false without panicking on ordering.
        let mut resources = offer(0.1, 10.0, 10.0);
        assert!(!fits_and_deduct(&mut resources, 1.0, 5120.0, 10240.0));
    }
}
