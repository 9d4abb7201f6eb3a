//! Registry of referenceable entity kinds.
//!
//! Every kind that can receive reviews is registered once at startup under a
//! [`TypeTag`], together with a repository that can look records up by their
//! string primary key. After startup the registry is shared read-only.

use crate::models::target::{MalformedTypeTag, TargetRef, TypeTag};
use async_trait::async_trait;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// A record that reviews can point at.
pub trait Entity: Any + Debug + Send + Sync {
    /// The record's identity, encoded as text.
    fn primary_key(&self) -> String;

    /// Data exposed to templates and expressions.
    fn to_json(&self) -> serde_json::Value;

    /// Helper to allow downcasting from the trait object.
    fn as_any(&self) -> &dyn Any;
}

pub type EntityHandle = Arc<dyn Entity>;

/// A repository could not answer a lookup.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("repository backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Uniform lookup-by-key over one entity kind.
#[async_trait]
pub trait EntityRepository: Debug + Send + Sync {
    async fn find(&self, primary_key: &str) -> Result<Option<EntityHandle>, RepositoryError>;
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    MalformedTypeTag(#[from] MalformedTypeTag),
    #[error("no entity type is registered as '{0}'")]
    UnknownType(String),
    #[error("entity with primary key {0:?} is of an unregistered type")]
    UnregisteredType(String),
    #[error("no object matching type '{type_tag}' and primary key {primary_key:?} exists")]
    NotFound { type_tag: TypeTag, primary_key: String },
    #[error("type tag '{0}' is registered twice")]
    DuplicateType(TypeTag),
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl ResolveError {
    /// True for outcomes that mean "the target is simply not there".
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::UnknownType(_))
    }
}

#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    repositories: HashMap<TypeTag, Arc<dyn EntityRepository>>,
    tags: HashMap<TypeId, TypeTag>,
    duplicate: Option<TypeTag>,
}

impl TypeRegistryBuilder {
    /// Registers `E` under `tag`, served by `repository`.
    pub fn register<E: Entity>(
        mut self,
        tag: TypeTag,
        repository: impl EntityRepository + 'static,
    ) -> Self {
        if self.repositories.contains_key(&tag) {
            self.duplicate.get_or_insert(tag);
            return self;
        }
        debug!(type_tag = %tag, entity = type_name::<E>(), "registering entity type");
        self.tags.insert(TypeId::of::<E>(), tag.clone());
        self.repositories.insert(tag, Arc::new(repository));
        self
    }

    pub fn build(self) -> Result<TypeRegistry, ResolveError> {
        if let Some(tag) = self.duplicate {
            return Err(ResolveError::DuplicateType(tag));
        }
        Ok(TypeRegistry {
            repositories: self.repositories,
            tags: self.tags,
        })
    }
}

#[derive(Debug)]
pub struct TypeRegistry {
    repositories: HashMap<TypeTag, Arc<dyn EntityRepository>>,
    tags: HashMap<TypeId, TypeTag>,
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    pub fn contains(&self, tag: &TypeTag) -> bool {
        self.repositories.contains_key(tag)
    }

    pub fn lookup(&self, tag: &TypeTag) -> Result<&Arc<dyn EntityRepository>, ResolveError> {
        self.repositories
            .get(tag)
            .ok_or_else(|| ResolveError::UnknownType(tag.to_string()))
    }

    pub fn lookup_by_instance(&self, entity: &dyn Entity) -> Result<&TypeTag, ResolveError> {
        self.tags
            .get(&Any::type_id(entity.as_any()))
            .ok_or_else(|| ResolveError::UnregisteredType(entity.primary_key()))
    }

    /// Parses `namespace.kind` and checks that the kind is registered.
    pub fn parse_type_tag(&self, text: &str) -> Result<TypeTag, ResolveError> {
        let tag: TypeTag = text.parse()?;
        if !self.contains(&tag) {
            return Err(ResolveError::UnknownType(tag.to_string()));
        }
        Ok(tag)
    }

    pub fn ref_for(&self, entity: &dyn Entity) -> Result<TargetRef, ResolveError> {
        let tag = self.lookup_by_instance(entity)?;
        Ok(TargetRef::new(tag.clone(), entity.primary_key()))
    }

    /// Fetches the live record behind `target`.
    pub async fn resolve(&self, target: &TargetRef) -> Result<EntityHandle, ResolveError> {
        let repository = self.lookup(&target.type_tag)?;
        repository
            .find(&target.primary_key)
            .await?
            .ok_or_else(|| ResolveError::NotFound {
                type_tag: target.type_tag.clone(),
                primary_key: target.primary_key.clone(),
            })
    }
}
