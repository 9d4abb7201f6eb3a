//! Parser for the review tag directives.
//!
//! ```text
//! get_review_count for event as review_count
//! get_review_count for calendar.event event.id as review_count
//! render_review_form for calendar.event 17
//! reviews_for_object event as review_list
//! ```
//!
//! Everything that can be checked without a render context is checked here,
//! so a broken directive fails when its page is loaded rather than on every
//! request.

use crate::models::target::TypeTag;
use crate::registry::{ResolveError, TypeRegistry};
use crate::render::{Expr, InvalidExpression};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("empty directive")]
    Empty,
    #[error("unknown review tag {0:?}")]
    UnknownTag(String),
    #[error("{tag:?} tag requires {expected} arguments")]
    Arity { tag: String, expected: &'static str },
    #[error("{ordinal} argument in {tag:?} tag must be {keyword:?}")]
    Syntax {
        tag: String,
        ordinal: &'static str,
        keyword: &'static str,
    },
    #[error("{tag:?} tag has a malformed type: {token:?} must be in the format 'namespace.kind'")]
    MalformedTypeTag { tag: String, token: String },
    #[error("{tag:?} tag has non-existent type: {token:?}")]
    UnknownType { tag: String, token: String },
    #[error("{tag:?} tag: {source}")]
    Expression {
        tag: String,
        #[source]
        source: InvalidExpression,
    },
}

/// Which store accessor a directive binds, or whether it renders the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    List,
    Count,
    AverageRating,
    Form,
}

impl TagKind {
    pub const LIST: &'static str = "get_review_list";
    pub const COUNT: &'static str = "get_review_count";
    pub const AVERAGE_RATING: &'static str = "get_review_avg_ratings";
    pub const FORM: &'static str = "render_review_form";
    /// Older spelling of the list tag: `reviews_for_object <expr> as <var>`.
    pub const LEGACY_LIST: &'static str = "reviews_for_object";

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            Self::LIST | Self::LEGACY_LIST => Some(TagKind::List),
            Self::COUNT => Some(TagKind::Count),
            Self::AVERAGE_RATING => Some(TagKind::AverageRating),
            Self::FORM => Some(TagKind::Form),
            _ => None,
        }
    }
}

/// How a directive finds its target at render time.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetSpec {
    /// An entity taken from the render context.
    Object(Expr),
    /// An explicit type plus a primary-key expression.
    Typed { type_tag: TypeTag, primary_key: Expr },
}

/// A parsed directive. Holds no render state, so one instance can be shared
/// by any number of concurrent renders.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub tag: String,
    pub kind: TagKind,
    pub target: TargetSpec,
    pub output: Option<String>,
}

impl Directive {
    /// Parses the contents of a tag, tag name included.
    pub fn parse(contents: &str, registry: &TypeRegistry) -> Result<Self, DirectiveError> {
        let tokens: Vec<&str> = contents.split_whitespace().collect();
        let (&tag, args) = tokens.split_first().ok_or(DirectiveError::Empty)?;
        let kind = TagKind::from_name(tag).ok_or_else(|| DirectiveError::UnknownTag(tag.to_string()))?;

        let directive = if tag == TagKind::LEGACY_LIST {
            parse_legacy_list(tag, args)?
        } else {
            if args.first().is_some_and(|first| *first != "for") {
                return Err(syntax(tag, "Second", "for"));
            }
            match (kind, args.len()) {
                (TagKind::Form, 2) => Directive {
                    tag: tag.to_string(),
                    kind,
                    target: TargetSpec::Object(compile(tag, args[1])?),
                    output: None,
                },
                (TagKind::Form, 3) => Directive {
                    tag: tag.to_string(),
                    kind,
                    target: typed(tag, args[1], args[2], registry)?,
                    output: None,
                },
                (TagKind::Form, _) => {
                    return Err(DirectiveError::Arity {
                        tag: tag.to_string(),
                        expected: "2 or 3",
                    })
                }
                (_, 4) => {
                    if args[2] != "as" {
                        return Err(syntax(tag, "Third", "as"));
                    }
                    Directive {
                        tag: tag.to_string(),
                        kind,
                        target: TargetSpec::Object(compile(tag, args[1])?),
                        output: Some(args[3].to_string()),
                    }
                }
                (_, 5) => {
                    if args[3] != "as" {
                        return Err(syntax(tag, "Fourth", "as"));
                    }
                    Directive {
                        tag: tag.to_string(),
                        kind,
                        target: typed(tag, args[1], args[2], registry)?,
                        output: Some(args[4].to_string()),
                    }
                }
                _ => {
                    return Err(DirectiveError::Arity {
                        tag: tag.to_string(),
                        expected: "4 or 5",
                    })
                }
            }
        };

        debug!(tag = %directive.tag, "parsed review directive");
        Ok(directive)
    }
}

fn parse_legacy_list(tag: &str, args: &[&str]) -> Result<Directive, DirectiveError> {
    if args.len() != 3 {
        return Err(DirectiveError::Arity {
            tag: tag.to_string(),
            expected: "exactly 3",
        });
    }
    if args[1] != "as" {
        return Err(syntax(tag, "Second", "as"));
    }
    Ok(Directive {
        tag: tag.to_string(),
        kind: TagKind::List,
        target: TargetSpec::Object(compile(tag, args[0])?),
        output: Some(args[2].to_string()),
    })
}

fn syntax(tag: &str, ordinal: &'static str, keyword: &'static str) -> DirectiveError {
    DirectiveError::Syntax {
        tag: tag.to_string(),
        ordinal,
        keyword,
    }
}

fn compile(tag: &str, token: &str) -> Result<Expr, DirectiveError> {
    Expr::compile(token).map_err(|source| DirectiveError::Expression {
        tag: tag.to_string(),
        source,
    })
}

fn typed(
    tag: &str,
    type_token: &str,
    pk_token: &str,
    registry: &TypeRegistry,
) -> Result<TargetSpec, DirectiveError> {
    let type_tag = registry
        .parse_type_tag(type_token)
        .map_err(|err| match err {
            ResolveError::UnknownType(_) => DirectiveError::UnknownType {
                tag: tag.to_string(),
                token: type_token.to_string(),
            },
            _ => DirectiveError::MalformedTypeTag {
                tag: tag.to_string(),
                token: type_token.to_string(),
            },
        })?;
    Ok(TargetSpec::Typed {
        type_tag,
        primary_key: compile(tag, pk_token)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{EntityHandle, EntityRepository, RepositoryError};
    use async_trait::async_trait;
    use serde_json::json;

    #[derive(Debug)]
    struct NoEvents;

    #[async_trait]
    impl EntityRepository for NoEvents {
        async fn find(&self, _primary_key: &str) -> Result<Option<EntityHandle>, RepositoryError> {
            Ok(None)
        }
    }

    #[derive(Debug)]
    struct Event;

    impl crate::registry::Entity for Event {
        fn primary_key(&self) -> String {
            "1".into()
        }
        fn to_json(&self) -> serde_json::Value {
            json!({})
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    fn registry() -> TypeRegistry {
        TypeRegistry::builder()
            .register::<Event>("calendar.event".parse().unwrap(), NoEvents)
            .build()
            .unwrap()
    }

    fn parse(contents: &str) -> Result<Directive, DirectiveError> {
        Directive::parse(contents, &registry())
    }

    #[test]
    fn test_object_form() {
        let directive = parse("get_review_list for foo_obj as reviews").unwrap();
        assert_eq!(directive.kind, TagKind::List);
        assert_eq!(directive.target, TargetSpec::Object(Expr::compile("foo_obj").unwrap()));
        assert_eq!(directive.output.as_deref(), Some("reviews"));
    }

    #[test]
    fn test_typed_form() {
        let directive = parse("get_review_count for calendar.event 17 as count").unwrap();
        assert_eq!(directive.kind, TagKind::Count);
        assert_eq!(
            directive.target,
            TargetSpec::Typed {
                type_tag: "calendar.event".parse().unwrap(),
                primary_key: Expr::Literal(json!(17)),
            }
        );
        assert_eq!(directive.output.as_deref(), Some("count"));
    }

    #[test]
    fn test_missing_for_is_a_syntax_error() {
        let err = parse("get_review_list foo_obj as reviews").unwrap_err();
        assert_eq!(err, syntax("get_review_list", "Second", "for"));
        assert_eq!(
            err.to_string(),
            "Second argument in \"get_review_list\" tag must be \"for\""
        );
    }

    #[test]
    fn test_misplaced_as() {
        assert_eq!(
            parse("get_review_count for event into count").unwrap_err(),
            syntax("get_review_count", "Third", "as")
        );
        assert_eq!(
            parse("get_review_count for calendar.event 17 into count").unwrap_err(),
            syntax("get_review_count", "Fourth", "as")
        );
    }

    #[test]
    fn test_arity() {
        for contents in [
            "get_review_count",
            "get_review_count for",
            "get_review_count for event",
            "get_review_count for event as",
            "get_review_count for calendar.event 17 as count extra",
        ] {
            assert!(
                matches!(parse(contents), Err(DirectiveError::Arity { ref tag, .. }) if tag == "get_review_count"),
                "{contents:?} should fail arity"
            );
        }
        assert!(matches!(
            parse("render_review_form for event as form"),
            Err(DirectiveError::Arity { expected: "2 or 3", .. })
        ));
    }

    #[test]
    fn test_type_errors_surface_at_parse_time() {
        assert_eq!(
            parse("get_review_count for shop.product 17 as count").unwrap_err(),
            DirectiveError::UnknownType {
                tag: "get_review_count".into(),
                token: "shop.product".into()
            }
        );
        assert_eq!(
            parse("get_review_count for calendar 17 as count").unwrap_err(),
            DirectiveError::MalformedTypeTag {
                tag: "get_review_count".into(),
                token: "calendar".into()
            }
        );
    }

    #[test]
    fn test_form_tag() {
        let object = parse("render_review_form for event").unwrap();
        assert_eq!(object.kind, TagKind::Form);
        assert!(object.output.is_none());

        let typed = parse("render_review_form for calendar.event event.id").unwrap();
        assert!(matches!(typed.target, TargetSpec::Typed { .. }));
    }

    #[test]
    fn test_legacy_list_tag() {
        let directive = parse("reviews_for_object event as review_list").unwrap();
        assert_eq!(directive.kind, TagKind::List);
        assert_eq!(directive.output.as_deref(), Some("review_list"));

        assert!(matches!(
            parse("reviews_for_object event review_list"),
            Err(DirectiveError::Arity { .. })
        ));
        assert_eq!(
            parse("reviews_for_object event into review_list").unwrap_err(),
            syntax("reviews_for_object", "Second", "as")
        );
    }

    #[test]
    fn test_unknown_tag_and_bad_expression() {
        assert_eq!(parse("").unwrap_err(), DirectiveError::Empty);
        assert_eq!(
            parse("get_reviews for event as x").unwrap_err(),
            DirectiveError::UnknownTag("get_reviews".into())
        );
        assert!(matches!(
            parse("get_review_list for ev-ent as x"),
            Err(DirectiveError::Expression { .. })
        ));
    }
}
