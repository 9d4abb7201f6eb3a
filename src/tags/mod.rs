//! Review template tags: the list, count, average and form directives.

pub mod directive;

pub use directive::{Directive, DirectiveError, TagKind, TargetSpec};

use crate::forms::{ReviewForm, ReviewValidator};
use crate::models::target::TargetRef;
use crate::registry::{EntityHandle, ResolveError, TypeRegistry};
use crate::render::{RenderContext, RenderError, TemplateRenderer, Value};
use crate::store::ReviewStore;
use serde_json::Value as Json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TagError {
    #[error("review store error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Shared services the tags render with.
#[derive(Clone)]
pub struct TagEnv {
    pub registry: Arc<TypeRegistry>,
    pub store: ReviewStore,
    pub templates: Arc<dyn TemplateRenderer>,
    pub validator: ReviewValidator,
}

impl Directive {
    /// Runs the directive against `ctx`.
    ///
    /// Binding tags store their result in the current scope under the output
    /// name and render as the empty string. The form tag renders the form.
    pub async fn render(&self, ctx: &mut RenderContext, env: &TagEnv) -> Result<String, TagError> {
        let target = self.target_ref(ctx, &env.registry);
        if target.is_none() {
            debug!(tag = %self.tag, "directive has no target");
        }

        let value: Json = match self.kind {
            TagKind::List => {
                let set = match &target {
                    Some(target) => env.store.for_target(target),
                    None => env.store.none(),
                };
                let reviews = set.fetch().await?;
                self.bind(ctx, Value::Reviews(reviews));
                return Ok(String::new());
            }
            TagKind::Count => {
                let count = match &target {
                    Some(target) => env.store.count_for_target(target).await?,
                    None => 0,
                };
                Json::from(count)
            }
            TagKind::AverageRating => {
                let average = match &target {
                    Some(target) => env.store.average_rating_for_target(target).await?,
                    None => None,
                };
                average.map_or(Json::Null, Json::from)
            }
            TagKind::Form => return self.render_form(target, ctx, env).await,
        };
        self.bind(ctx, Value::Data(value));
        Ok(String::new())
    }

    fn bind(&self, ctx: &mut RenderContext, value: Value) {
        if let Some(name) = &self.output {
            ctx.insert(name.clone(), value);
        }
    }

    /// Works out what the directive points at in this render, if anything.
    fn target_ref(&self, ctx: &RenderContext, registry: &TypeRegistry) -> Option<TargetRef> {
        match &self.target {
            TargetSpec::Object(expr) => {
                let value = expr.evaluate(ctx).ok()?;
                let Some(entity) = value.as_entity() else {
                    warn!(tag = %self.tag, expr = %expr, "expression is not an entity");
                    return None;
                };
                match registry.ref_for(entity.as_ref()) {
                    Ok(target) => Some(target),
                    Err(err) => {
                        warn!(tag = %self.tag, expr = %expr, "{err}");
                        None
                    }
                }
            }
            TargetSpec::Typed {
                type_tag,
                primary_key,
            } => {
                let primary_key = primary_key.evaluate(ctx).ok()?.as_primary_key()?;
                Some(TargetRef::new(type_tag.clone(), primary_key))
            }
        }
    }

    async fn render_form(
        &self,
        target: Option<TargetRef>,
        ctx: &mut RenderContext,
        env: &TagEnv,
    ) -> Result<String, TagError> {
        let Some(target) = target else {
            return Ok(String::new());
        };
        let entity: EntityHandle = match env.registry.resolve(&target).await {
            Ok(entity) => entity,
            Err(err) if err.is_miss() => {
                debug!(%target, "review form target not found");
                return Ok(String::new());
            }
            Err(err) => return Err(err.into()),
        };

        let form = ReviewForm::blank(Some(target.clone()), &env.validator);
        ctx.push();
        ctx.insert("form", form.to_json());
        ctx.insert("target", entity);
        let rendered = env
            .templates
            .render_first(&form_template_names(&target), &ctx.to_json());
        ctx.pop();
        Ok(rendered?)
    }
}

/// Candidate form templates, most specific first.
pub fn form_template_names(target: &TargetRef) -> Vec<String> {
    let tag = &target.type_tag;
    vec![
        format!("reviews/{}/{}/form.html", tag.namespace(), tag.kind()),
        format!("reviews/{}/form.html", tag.namespace()),
        "reviews/form.html".to_string(),
    ]
}

/// Renders `directives` in order against one context, so later directives
/// see what earlier ones bound.
pub async fn render_all(
    directives: &[Directive],
    ctx: &mut RenderContext,
    env: &TagEnv,
) -> Result<Vec<String>, TagError> {
    let mut outputs = Vec::with_capacity(directives.len());
    for directive in directives {
        outputs.push(directive.render(ctx, env).await?);
    }
    Ok(outputs)
}
