// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::collections::BTreeSet;

/// Field indices below this bound live in the inline bitset; larger indices
/// spill into the overflow set.
const BASE_FIELDS_COUNT: u16 = 128;

/// Per-instance set of dirty field indices (1..=65535).
///
/// A field index is in exactly one of the two stores: the `u128` bitset for
/// small indices, the ordered overflow set otherwise. `dirty_count` spans
/// both, so [`DirtySet::has_any_dirty`] is constant time.
#[derive(Default, Debug, Clone)]
pub struct DirtySet {
    base_fields: u128,
    extra_fields: BTreeSet<u16>,
    dirty_count: usize,
}

impl DirtySet {
    pub fn new() -> DirtySet {
        DirtySet::default()
    }

    #[inline(always)]
    pub fn is_dirty(&self, index: u16) -> bool {
        if index < BASE_FIELDS_COUNT {
            self.base_fields & (1u128 << index) != 0
        } else {
            self.extra_fields.contains(&index)
        }
    }

    #[inline(always)]
    pub fn has_any_dirty(&self) -> bool {
        self.dirty_count > 0
    }

    fn set(&mut self, index: u16, value: bool) -> bool {
        if index < BASE_FIELDS_COUNT {
            let mask = 1u128 << index;
            if (self.base_fields & mask != 0) != value {
                self.base_fields ^= mask;
                return true;
            }
        } else if value {
            return self.extra_fields.insert(index);
        } else {
            return self.extra_fields.remove(&index);
        }
        false
    }

    pub fn set_dirty(&mut self, index: u16) {
        if self.set(index, true) {
            self.dirty_count += 1;
        }
    }

    pub fn clear_dirty(&mut self, index: u16) {
        if self.set(index, false) {
            self.dirty_count -= 1;
        }
    }

    pub fn clear_all(&mut self) {
        self.base_fields = 0;
        self.extra_fields.clear();
        self.dirty_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_and_overflow_indices() {
        let mut set = DirtySet::new();
        assert!(!set.has_any_dirty());

        set.set_dirty(1);
        set.set_dirty(127);
        set.set_dirty(128);
        set.set_dirty(65535);
        assert!(set.has_any_dirty());
        assert!(set.is_dirty(1));
        assert!(set.is_dirty(127));
        assert!(set.is_dirty(128));
        assert!(set.is_dirty(65535));
        assert!(!set.is_dirty(2));

        // idempotent set must not skew the counter
        set.set_dirty(1);
        set.clear_dirty(1);
        assert!(!set.is_dirty(1));
        assert!(set.has_any_dirty());

        set.clear_dirty(127);
        set.clear_dirty(128);
        set.clear_dirty(65535);
        assert!(!set.has_any_dirty());
    }

    #[test]
    fn clear_all_resets_counter() {
        let mut set = DirtySet::new();
        set.set_dirty(3);
        set.set_dirty(300);
        set.clear_all();
        assert!(!set.has_any_dirty());
        assert!(!set.is_dirty(3));
        assert!(!set.is_dirty(300));
    }
}
