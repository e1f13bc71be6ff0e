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

use crate::config::ProductWeight;

/// Weighted round-robin over product categories. `next()` pops the
/// head and rotates it to the tail, so the multiset of elements never
/// changes over the process lifetime (spec §3, §8).
///
/// Not `Sync`-wrapped: only the refill job touches it (spec §4.3,
/// §5), so no internal lock is needed.
pub struct ProductRotation {
    sequence: VecDeque<String>,
}

impl ProductRotation {
    pub fn new(weights: &[ProductWeight]) -> ProductRotation {
        let mut sequence = VecDeque::new();
        for w in weights {
            for _ in 0..w.weight {
                sequence.push_back(w.category.clone());
            }
        }
        ProductRotation { sequence }
    }

    /// Returns the head category and rotates it to the tail. Panics if
    /// constructed from an empty weight list — that's a configuration
    /// error, not a runtime condition this type should paper over.
    pub fn next(&mut self) -> String {
        let category = self
            .sequence
            .pop_front()
            .expect("product rotation has no categories configured");
        self.sequence.push_back(category.clone());
        category
    }

    #[cfg(test)]
    fn as_vec(&self) -> Vec<String> {
        self.sequence.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> Vec<ProductWeight> {
        vec![
            ProductWeight { category: "landsat".into(), weight: 3 },
            ProductWeight { category: "modis".into(), weight: 2 },
            ProductWeight { category: "viirs".into(), weight: 1 },
            ProductWeight { category: "plot".into(), weight: 1 },
        ]
    }

    #[test]
    fn weighted_sequence_matches_spec_example() {
        let mut rotation = ProductRotation::new(&weights());
        let mut seen = vec![];
        for _ in 0..7 {
            seen.push(rotation.next());
        }
        assert_eq!(
            seen,
            vec!["landsat", "landsat", "landsat", "modis", "modis", "viirs", "plot"]
        );
    }

    #[test]
    fn full_cycle_restores_original_order() {
        let mut rotation = ProductRotation::new(&weights());
        let before = rotation.as_vec();
        let total: u32 = weights().iter().map(|w| w.weight).sum();
        for _ in 0..total {
            rotation.next();
        }
        assert_eq!(rotation.as_vec(), before);
    }
}
