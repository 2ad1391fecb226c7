// Copyright 2026 Tobin Edwards
//
//    Licensed under the Apache License, Version 2.0 (the "License");
//    you may not use this file except in compliance with the License.
//    You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
//    Unless required by applicable law or agreed to in writing, software
//    distributed under the License is distributed on an "AS IS" BASIS,
//    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//    See the License for the specific language governing permissions and
//    limitations under the License.

/// A picked (or candidate) move together with its afterstate value and
/// the afterstate tensor the value was computed from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MoveData {
    pub move_id: i32,
    pub value: f64,
    pub after_state: Vec<f64>,
}

impl MoveData {
    pub fn new(move_id: i32, value: f64, after_state: Vec<f64>) -> Self {
        Self {
            move_id,
            value,
            after_state,
        }
    }
}

/// Bounded collection keeping the `capacity` highest-valued moves seen
/// so far; ties are broken in favor of the earlier insertion. Used by
/// top-k exploration.
#[derive(Debug)]
pub struct MoveCollector {
    capacity: usize,
    collection: Vec<MoveData>,
}

impl MoveCollector {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            collection: Vec::with_capacity(capacity),
        }
    }

    /// Offers a move to the collection; the lowest-valued retained item
    /// is evicted when a better one arrives at capacity.
    pub fn add(&mut self, move_id: i32, move_value: f64, after_state: &[f64]) {
        if self.collection.len() < self.capacity {
            self.collection
                .push(MoveData::new(move_id, move_value, after_state.to_vec()));
            return;
        }

        let mut least_value = f64::MAX;
        let mut least_item_id = usize::MAX;
        for (item_id, item) in self.collection.iter().enumerate() {
            if item.value < least_value {
                least_value = item.value;
                least_item_id = item_id;
            }
        }

        if least_value < move_value {
            self.collection[least_item_id] = MoveData::new(move_id, move_value, after_state.to_vec());
        }
    }

    pub fn get(&self, item_id: usize) -> &MoveData {
        &self.collection[item_id]
    }

    /// Moves the item out of the collection.
    pub fn take(&mut self, item_id: usize) -> MoveData {
        std::mem::take(&mut self.collection[item_id])
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
