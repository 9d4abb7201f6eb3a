use crate::registry::Entity;
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Type tag items are registered under.
pub const ITEM_TYPE_TAG: &str = "catalog.item";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,          // Unique ID for the item
    pub name: String,        // Item name
    pub description: String, // Short description of the item
}

impl Entity for Item {
    fn primary_key(&self) -> String {
        self.id.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
