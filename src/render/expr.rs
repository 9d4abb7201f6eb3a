use crate::render::context::{RenderContext, Value};
use serde_json::Value as Json;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse expression {0:?}")]
pub struct InvalidExpression(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("variable {0:?} does not exist")]
pub struct VariableDoesNotExist(pub String);

/// An expression compiled once and evaluated against each render's context.
///
/// Evaluation only reads the context, so one compiled expression can serve
/// any number of concurrent renders.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Json),
    Variable { name: String, path: Vec<String> },
}

impl Expr {
    pub fn compile(token: &str) -> Result<Self, InvalidExpression> {
        if let Some(text) = quoted(token) {
            return Ok(Expr::Literal(Json::String(text.to_string())));
        }
        if let Ok(int) = token.parse::<i64>() {
            return Ok(Expr::Literal(Json::from(int)));
        }
        if let Ok(float) = token.parse::<f64>() {
            if let Some(number) = serde_json::Number::from_f64(float) {
                return Ok(Expr::Literal(Json::Number(number)));
            }
        }

        let mut segments = token.split('.');
        let name = segments.next().unwrap_or_default();
        let path: Vec<String> = segments.map(str::to_string).collect();
        let valid_name = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && is_identifier(name);
        if !valid_name || !path.iter().all(|segment| is_identifier(segment)) {
            return Err(InvalidExpression(token.to_string()));
        }
        Ok(Expr::Variable {
            name: name.to_string(),
            path,
        })
    }

    pub fn evaluate(&self, ctx: &RenderContext) -> Result<Value, VariableDoesNotExist> {
        match self {
            Expr::Literal(json) => Ok(Value::Data(json.clone())),
            Expr::Variable { name, path } => {
                let missing = || VariableDoesNotExist(self.to_string());
                let mut value = ctx.get(name).cloned().ok_or_else(missing)?;
                for segment in path {
                    value = value.attribute(segment).ok_or_else(missing)?;
                }
                Ok(value)
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(json) => write!(f, "{json}"),
            Expr::Variable { name, path } => {
                f.write_str(name)?;
                for segment in path {
                    write!(f, ".{segment}")?;
                }
                Ok(())
            }
        }
    }
}

fn quoted(token: &str) -> Option<&str> {
    ['"', '\''].into_iter().find_map(|quote| {
        token
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
    })
}

fn is_identifier(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
