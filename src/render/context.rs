use crate::models::review::Review;
use crate::registry::EntityHandle;
use serde_json::{Map, Value as Json};
use std::collections::HashMap;

/// Anything a page can hold in its render context.
#[derive(Debug, Clone)]
pub enum Value {
    Entity(EntityHandle),
    Reviews(Vec<Review>),
    Data(Json),
}

impl Value {
    /// Looks up a named member, as used by dotted expressions.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        match self {
            Value::Entity(entity) if name == "pk" => Some(Value::Data(Json::String(entity.primary_key()))),
            Value::Entity(entity) => entity.to_json().get(name).cloned().map(Value::Data),
            Value::Reviews(reviews) => {
                let index: usize = name.parse().ok()?;
                let review = reviews.get(index)?;
                serde_json::to_value(review).ok().map(Value::Data)
            }
            Value::Data(Json::Object(map)) => map.get(name).cloned().map(Value::Data),
            Value::Data(Json::Array(items)) => {
                let index: usize = name.parse().ok()?;
                items.get(index).cloned().map(Value::Data)
            }
            Value::Data(_) => None,
        }
    }

    /// Reads the value as a primary key. Null, empty and structured values
    /// have no key.
    pub fn as_primary_key(&self) -> Option<String> {
        match self {
            Value::Entity(entity) => Some(entity.primary_key()),
            Value::Data(Json::String(s)) if !s.is_empty() => Some(s.clone()),
            Value::Data(Json::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityHandle> {
        match self {
            Value::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Value::Entity(entity) => entity.to_json(),
            Value::Reviews(reviews) => serde_json::to_value(reviews).unwrap_or_default(),
            Value::Data(json) => json.clone(),
        }
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Value::Data(json)
    }
}

/// Variables visible to one render, layered in scopes.
///
/// Lookups search from the innermost scope outwards. The outermost scope is
/// never popped.
#[derive(Debug, Clone)]
pub struct RenderContext {
    scopes: Vec<HashMap<String, Value>>,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderContext {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), value.into());
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Flattens every scope into one JSON object for a template engine.
    pub fn to_json(&self) -> Json {
        let mut map = Map::new();
        for scope in &self.scopes {
            for (name, value) in scope {
                map.insert(name.clone(), value.to_json());
            }
        }
        Json::Object(map)
    }
}

impl From<EntityHandle> for Value {
    fn from(entity: EntityHandle) -> Self {
        Value::Entity(entity)
    }
}

impl From<Vec<Review>> for Value {
    fn from(reviews: Vec<Review>) -> Self {
        Value::Reviews(reviews)
    }
}
