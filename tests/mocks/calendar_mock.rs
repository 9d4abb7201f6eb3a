//! An in-memory `calendar.event` kind, registered next to nothing else.

use async_trait::async_trait;
use reviewware::config::ReviewSettings;
use reviewware::db::Database;
use reviewware::forms::ReviewValidator;
use reviewware::models::target::TargetRef;
use reviewware::registry::{Entity, EntityHandle, EntityRepository, RepositoryError, TypeRegistry};
use reviewware::render::{TemplateRenderer, TemplateSet};
use reviewware::store::ReviewStore;
use reviewware::submission::ReviewSubmitter;
use reviewware::tags::TagEnv;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

pub const EVENT_TYPE_TAG: &str = "calendar.event";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: u32,
    pub title: String,
}

impl Event {
    pub fn new(id: u32, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
        }
    }
}

impl Entity for Event {
    fn primary_key(&self) -> String {
        self.id.to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A kind that is never registered.
#[derive(Debug)]
pub struct Venue;

impl Entity for Venue {
    fn primary_key(&self) -> String {
        "hall".into()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "name": "Hall" })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct EventRepository {
    events: HashMap<String, Event>,
}

impl EventRepository {
    pub fn with_events(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            events: events
                .into_iter()
                .map(|event| (event.primary_key(), event))
                .collect(),
        }
    }
}

#[async_trait]
impl EntityRepository for EventRepository {
    async fn find(&self, primary_key: &str) -> Result<Option<EntityHandle>, RepositoryError> {
        Ok(self
            .events
            .get(primary_key)
            .cloned()
            .map(|event| Arc::new(event) as EntityHandle))
    }
}

pub fn event_target(id: u32) -> TargetRef {
    TargetRef::new(EVENT_TYPE_TAG.parse().unwrap(), id.to_string())
}

/// Everything a test needs, wired to one in-memory database.
pub struct TestEnv {
    pub db: Database,
    pub registry: Arc<TypeRegistry>,
    pub store: ReviewStore,
    pub tags: TagEnv,
    pub submitter: ReviewSubmitter,
}

pub async fn setup_test_env(events: Vec<Event>, settings: ReviewSettings) -> TestEnv {
    let db = Database::new(":memory:").unwrap();
    db.create_schema().await.unwrap();

    let registry = Arc::new(
        TypeRegistry::builder()
            .register::<Event>(EVENT_TYPE_TAG.parse().unwrap(), EventRepository::with_events(events))
            .build()
            .unwrap(),
    );
    let store = ReviewStore::new(db.clone());
    let validator = ReviewValidator::new(&settings);
    let templates: Arc<dyn TemplateRenderer> = Arc::new(TemplateSet::with_defaults().unwrap());

    TestEnv {
        tags: TagEnv {
            registry: registry.clone(),
            store: store.clone(),
            templates,
            validator: validator.clone(),
        },
        submitter: ReviewSubmitter::new(registry.clone(), store.clone(), validator),
        db,
        registry,
        store,
    }
}
