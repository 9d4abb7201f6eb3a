use handlebars::Handlebars;
use serde_json::Value as Json;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("none of the templates {0:?} exist")]
    TemplateNotFound(Vec<String>),
    #[error("template {name} failed to compile: {source}")]
    Template {
        name: String,
        #[source]
        source: Box<handlebars::TemplateError>,
    },
    #[error(transparent)]
    Render(#[from] handlebars::RenderError),
}

/// Page rendering as seen by the review tags and the submission endpoint.
pub trait TemplateRenderer: Send + Sync {
    fn has_template(&self, name: &str) -> bool;

    fn render(&self, name: &str, data: &Json) -> Result<String, RenderError>;

    /// Renders the first template of `names` that exists.
    fn render_first(&self, names: &[String], data: &Json) -> Result<String, RenderError> {
        let name = names
            .iter()
            .find(|name| self.has_template(name))
            .ok_or_else(|| RenderError::TemplateNotFound(names.to_vec()))?;
        debug!(template = %name, "rendering template");
        self.render(name, data)
    }
}

const FORM_TEMPLATE: &str = r#"<form action="/reviews/post/" method="post" class="review-form">
  <input type="hidden" name="typeTag" value="{{form.target.type_tag}}">
  <input type="hidden" name="primaryKey" value="{{form.target.primary_key}}">
  {{#if form.next}}<input type="hidden" name="next" value="{{form.next}}">{{else}}{{#if next}}<input type="hidden" name="next" value="{{next}}">{{/if}}{{/if}}
  <label>Rating <input type="number" name="rating" min="0" value="{{form.data.rating}}"></label>
  {{#each form.errors.rating}}<span class="error">{{this}}</span>{{/each}}
  <label>Title <input type="text" name="title" maxlength="255" value="{{form.data.title}}"></label>
  {{#each form.errors.title}}<span class="error">{{this}}</span>{{/each}}
  <label>Review Content <textarea name="content" maxlength="{{form.max_content_length}}">{{form.data.content}}</textarea></label>
  {{#each form.errors.content}}<span class="error">{{this}}</span>{{/each}}
  <button type="submit">Post review</button>
</form>
"#;

const PREVIEW_TEMPLATE: &str = r#"<h1>Please correct the errors below</h1>
<ul class="errors">
{{#each form.errors}}{{#each this}}<li>{{this}}</li>{{/each}}{{/each}}
</ul>
{{> form}}"#;

const POST_TEMPLATE: &str = r#"<h1>Post a review</h1>
{{#if form.target}}{{> form}}{{else}}<p>Choose something to review first.</p>{{/if}}"#;

const BAD_REQUEST_DEBUG_TEMPLATE: &str = r#"<h1>Review post not allowed (400)</h1>
<p>The review you tried to post to this view wasn't saved because something
tampered with the security information in the review form.</p>
<p>Why: {{why}}</p>"#;

const ITEM_TEMPLATE: &str = r#"<h1>{{item.name}}</h1>
<p>{{item.description}}</p>
<p class="rating">{{#if review_count}}{{review_rating}} / 5{{else}}Not yet rated{{/if}} ({{review_count}} reviews)</p>
<ul class="reviews">
{{#each reviews}}<li><strong>{{this.title}}</strong> ({{this.rating}}) {{this.content}}</li>{{/each}}
</ul>
{{{review_form}}}"#;

/// The bundled template set, rendered with handlebars.
#[derive(Debug)]
pub struct TemplateSet {
    registry: Handlebars<'static>,
}

impl TemplateSet {
    pub fn empty() -> Self {
        Self {
            registry: Handlebars::new(),
        }
    }

    /// Templates for the review form, the error preview, the submission page
    /// and the item page. Any of them can be overridden with [`Self::register`].
    pub fn with_defaults() -> Result<Self, RenderError> {
        let mut set = Self::empty();
        set.register("form", FORM_TEMPLATE)?;
        set.register("reviews/form.html", FORM_TEMPLATE)?;
        set.register("reviews/preview.html", PREVIEW_TEMPLATE)?;
        set.register("reviews/post.html", POST_TEMPLATE)?;
        set.register("reviews/400-debug.html", BAD_REQUEST_DEBUG_TEMPLATE)?;
        set.register("catalog/item.html", ITEM_TEMPLATE)?;
        Ok(set)
    }

    pub fn register(&mut self, name: &str, source: &str) -> Result<(), RenderError> {
        self.registry
            .register_template_string(name, source)
            .map_err(|e| RenderError::Template {
                name: name.to_string(),
                source: Box::new(e),
            })
    }
}

impl TemplateRenderer for TemplateSet {
    fn has_template(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    fn render(&self, name: &str, data: &Json) -> Result<String, RenderError> {
        Ok(self.registry.render(name, data)?)
    }
}
