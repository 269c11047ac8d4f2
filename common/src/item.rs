//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Items and character inventories

use serde::{Deserialize, Serialize};

/// A stack of identical items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub quantity: u32,
}

impl Item {
    /// Create a new item stack
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }
}

/// A character inventory. Receiving merges stacks by item name; giving
/// decrements and drops the stack at zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory(Vec<Item>);

impl Inventory {
    /// Create an empty inventory
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a quantity of an item, merging into an existing stack by name
    pub fn add(&mut self, name: &str, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.0.iter_mut().find(|item| item.name == name) {
            Some(item) => item.quantity += quantity,
            None => self.0.push(Item::new(name, quantity)),
        }
    }

    /// Remove a quantity of an item. Returns false (and leaves the inventory
    /// untouched) when the item is absent or the stack is too small.
    pub fn remove(&mut self, name: &str, quantity: u32) -> bool {
        let Some(index) = self.0.iter().position(|item| item.name == name) else {
            return false;
        };
        if self.0[index].quantity < quantity {
            return false;
        }
        self.0[index].quantity -= quantity;
        if self.0[index].quantity == 0 {
            self.0.remove(index);
        }
        true
    }

    /// Quantity held of a named item (0 when absent)
    pub fn quantity_of(&self, name: &str) -> u32 {
        self.0
            .iter()
            .find(|item| item.name == name)
            .map(|item| item.quantity)
            .unwrap_or(0)
    }

    /// True when at least one of the named item is held
    pub fn contains(&self, name: &str) -> bool {
        self.quantity_of(name) > 0
    }

    /// True when nothing is held
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the item stacks
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.0.iter()
    }

    /// One "name  quantity" line per stack, for service prompts
    pub fn describe(&self) -> String {
        self.0
            .iter()
            .map(|item| format!("{}  {}", item.name, item.quantity))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_merges_stacks() {
        let mut inventory = Inventory::new();
        inventory.add("coin", 3);
        inventory.add("coin", 2);
        inventory.add("bread", 1);
        assert_eq!(inventory.quantity_of("coin"), 5);
        assert_eq!(inventory.quantity_of("bread"), 1);
        assert_eq!(inventory.items().count(), 2);
    }

    #[test]
    fn test_remove_partial_and_full() {
        let mut inventory = Inventory::new();
        inventory.add("coin", 5);
        assert!(inventory.remove("coin", 2));
        assert_eq!(inventory.quantity_of("coin"), 3);
        assert!(inventory.remove("coin", 3));
        assert!(!inventory.contains("coin"));
        assert!(inventory.is_empty());
    }

    #[test]
    fn test_remove_insufficient_is_untouched() {
        let mut inventory = Inventory::new();
        inventory.add("coin", 1);
        assert!(!inventory.remove("coin", 2));
        assert!(!inventory.remove("bread", 1));
        assert_eq!(inventory.quantity_of("coin"), 1);
    }

    #[test]
    fn test_describe() {
        let mut inventory = Inventory::new();
        inventory.add("relic", 1);
        inventory.add("coin", 12);
        assert_eq!(inventory.describe(), "relic  1\ncoin  12");
    }
}
