use crate::config::Settings;
use crate::db::{Database, ItemRepository};
use crate::forms::{ReviewForm, ReviewValidator};
use crate::models::item::{Item, ITEM_TYPE_TAG};
use crate::models::review::UserId;
use crate::models::target::{MalformedTypeTag, TypeTag};
use crate::registry::{EntityHandle, TypeRegistry};
use crate::render::{RenderContext, TemplateRenderer};
use crate::store::ReviewStore;
use crate::submission::{ReviewPayload, ReviewSubmitter, Submission, SubmissionError};
use crate::tags::{self, Directive, TagEnv};
use actix_web::http::header;
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// The signed-in user, put into request extensions by whatever
/// authentication layer sits in front of these handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    TypeTag(#[from] MalformedTypeTag),
    #[error(transparent)]
    Registry(#[from] crate::registry::ResolveError),
    #[error(transparent)]
    Directive(#[from] tags::DirectiveError),
}

const ITEM_PAGE_DIRECTIVES: [&str; 4] = [
    "get_review_list for item as reviews",
    "get_review_count for item as review_count",
    "get_review_avg_ratings for catalog.item item.id as review_rating",
    "render_review_form for item",
];

/// Shared state for every worker.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub registry: Arc<TypeRegistry>,
    pub templates: Arc<dyn TemplateRenderer>,
    pub submitter: ReviewSubmitter,
    pub tags: TagEnv,
    item_page: Arc<Vec<Directive>>,
    debug: bool,
}

impl AppState {
    /// Registers the catalog types and parses the page directives. Any
    /// directive mistake fails here, before the server starts.
    pub fn new(
        settings: &Settings,
        db: Database,
        templates: Arc<dyn TemplateRenderer>,
    ) -> Result<Self, StartupError> {
        let item_tag: TypeTag = ITEM_TYPE_TAG.parse()?;
        let registry = Arc::new(
            TypeRegistry::builder()
                .register::<Item>(item_tag, ItemRepository::new(db.clone()))
                .build()?,
        );
        let store = ReviewStore::new(db.clone());
        let validator = ReviewValidator::new(&settings.reviews);

        let item_page = ITEM_PAGE_DIRECTIVES
            .iter()
            .map(|contents| Directive::parse(contents, &registry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            submitter: ReviewSubmitter::new(registry.clone(), store.clone(), validator.clone()),
            tags: TagEnv {
                registry: registry.clone(),
                store,
                templates: templates.clone(),
                validator,
            },
            db,
            registry,
            templates,
            item_page: Arc::new(item_page),
            debug: settings.debug,
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/reviews/post/")
            .route(web::post().to(post_review))
            .route(web::get().to(review_page))
            // Any other method gets the submission page too
            .route(web::route().to(review_page)),
    )
    .service(
        web::scope("/api")
            .route("/items", web::get().to(get_items)) // GET /api/items
            .route("/items", web::post().to(create_item)) // POST /api/items
            .route("/items/{id}", web::get().to(get_item)), // GET /api/items/{id}
    )
    .route("/items/{id}", web::get().to(item_page));
}

fn render_html(state: &AppState, names: &[String], data: &serde_json::Value) -> HttpResponse {
    match state.templates.render_first(names, data) {
        Ok(body) => HttpResponse::Ok().content_type("text/html; charset=utf-8").body(body),
        Err(err) => {
            error!("[API] Template error: {}", err);
            HttpResponse::InternalServerError().body("Failed to render page")
        }
    }
}

fn post_page(state: &AppState, form: &ReviewForm) -> HttpResponse {
    render_html(state, &["reviews/post.html".to_string()], &json!({ "form": form.to_json() }))
}

fn bad_request(state: &AppState, why: &str) -> HttpResponse {
    warn!("[API] Rejected review post: {}", why);
    if !state.debug {
        return HttpResponse::BadRequest().finish();
    }
    match state.templates.render("reviews/400-debug.html", &json!({ "why": why })) {
        Ok(body) => HttpResponse::BadRequest()
            .content_type("text/html; charset=utf-8")
            .body(body),
        Err(err) => {
            error!("[API] Template error: {}", err);
            HttpResponse::BadRequest().finish()
        }
    }
}

pub async fn post_review(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Form<ReviewPayload>,
) -> HttpResponse {
    let user_id = req
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.0.clone());

    match state.submitter.submit(payload.into_inner(), user_id).await {
        Ok(Submission::Created { review, next: Some(next) }) => {
            info!("[API] Review {} posted, redirecting to {}", review.id(), next);
            HttpResponse::SeeOther()
                .insert_header((header::LOCATION, next))
                .finish()
        }
        Ok(Submission::Created { review, next: None }) => {
            info!("[API] Review {} posted", review.id());
            let form = ReviewForm::blank(Some(review.target.clone()), state.submitter.validator());
            post_page(&state, &form)
        }
        Ok(Submission::Rejected { form, template_names }) => {
            render_html(&state, &template_names, &json!({ "form": form.to_json() }))
        }
        Err(SubmissionError::BadRequest(why)) => bad_request(&state, &why.to_string()),
        Err(SubmissionError::Store(err)) => {
            error!("[API] Database error: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to save review")
        }
        Err(SubmissionError::Repository(err)) => {
            error!("[API] Lookup error: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to load review target")
        }
    }
}

pub async fn review_page(state: web::Data<AppState>, query: web::Query<ReviewPayload>) -> HttpResponse {
    match state.submitter.blank_form(&query).await {
        Ok(form) => post_page(&state, &form),
        Err(err) => {
            error!("[API] Database error: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to load review form")
        }
    }
}

pub async fn get_items(state: web::Data<AppState>) -> HttpResponse {
    match state.db.get_items().await {
        Ok(items) => {
            info!("[API] Returning {} items", items.len());
            HttpResponse::Ok().json(items)
        }
        Err(err) => {
            error!("[API] Failed to fetch items: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to fetch items")
        }
    }
}

pub async fn create_item(state: web::Data<AppState>, item: web::Json<Item>) -> HttpResponse {
    let item = item.into_inner();
    info!("[API] Received item request - Item ID: {}", item.id);
    if item.id.trim().is_empty() {
        return HttpResponse::BadRequest().body("Item id must not be empty");
    }
    match state.db.insert_item(&item).await {
        Ok(()) => {
            info!("[API] Successfully saved item ID: {}", item.id);
            HttpResponse::Ok().json(item)
        }
        Err(err) => {
            error!("[API] Database error: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to save item")
        }
    }
}

pub async fn get_item(state: web::Data<AppState>, id: web::Path<String>) -> HttpResponse {
    match state.db.get_item(&id).await {
        Ok(Some(item)) => HttpResponse::Ok().json(item),
        Ok(None) => HttpResponse::NotFound().body("Item not found"),
        Err(err) => {
            error!("[API] Failed to fetch item {}: {:?}", id, err);
            HttpResponse::InternalServerError().body("Failed to fetch item")
        }
    }
}

/// Item page: the item, its reviews and rating, and a form to add one.
pub async fn item_page(state: web::Data<AppState>, id: web::Path<String>) -> HttpResponse {
    let id = id.into_inner();
    let item = match state.db.get_item(&id).await {
        Ok(Some(item)) => item,
        Ok(None) => return HttpResponse::NotFound().body("Item not found"),
        Err(err) => {
            error!("[API] Failed to fetch item {}: {:?}", id, err);
            return HttpResponse::InternalServerError().body("Failed to fetch item");
        }
    };

    let mut ctx = RenderContext::new();
    ctx.insert("item", Arc::new(item) as EntityHandle);
    ctx.insert("next", json!(format!("/items/{id}")));

    let outputs = match tags::render_all(&state.item_page, &mut ctx, &state.tags).await {
        Ok(outputs) => outputs,
        Err(err) => {
            error!("[API] Failed to render review tags for item {}: {}", id, err);
            return HttpResponse::InternalServerError().body("Failed to render page");
        }
    };
    ctx.insert("review_form", json!(outputs.concat()));

    render_html(&state, &["catalog/item.html".to_string()], &ctx.to_json())
}
