//! Render-time plumbing shared by the review tags and the HTTP surface.

pub mod context;
pub mod expr;
pub mod templates;

pub use context::{RenderContext, Value};
pub use expr::{Expr, InvalidExpression, VariableDoesNotExist};
pub use templates::{RenderError, TemplateRenderer, TemplateSet};
