//! Program text: JSON s-expressions.
//!
//! Numbers are integers, strings are identifiers, arrays are forms.

use serde_json::Value as Json;

use crate::error::{ErrorKind, Result, RuntimeError};
use crate::language::limits;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Int(i64),
    Ident(String),
    List(Vec<Expr>),
}

impl Expr {
    pub fn node_count(&self) -> usize {
        match self {
            Expr::Int(_) | Expr::Ident(_) => 1,
            Expr::List(items) => 1 + items.iter().map(Expr::node_count).sum::<usize>(),
        }
    }

    pub fn max_depth(&self) -> usize {
        match self {
            Expr::Int(_) | Expr::Ident(_) => 1,
            Expr::List(items) => 1 + items.iter().map(Expr::max_depth).max().unwrap_or(0),
        }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expr::Ident(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Head identifier of a form.
    pub fn head(&self) -> Option<&str> {
        match self {
            Expr::List(items) => items.first().and_then(Expr::as_ident),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Expr::Int(i) => Json::from(*i),
            Expr::Ident(s) => Json::String(s.clone()),
            Expr::List(items) => Json::Array(items.iter().map(Expr::to_json).collect()),
        }
    }
}

fn malformed(message: String) -> RuntimeError {
    RuntimeError::new(ErrorKind::Eval, message)
}

pub fn expr_from_json(v: &Json) -> Result<Expr> {
    match v {
        Json::Number(n) => n
            .as_i64()
            .map(Expr::Int)
            .ok_or_else(|| malformed(format!("number is not an i64: {n}"))),
        Json::String(s) => Ok(Expr::Ident(s.to_string())),
        Json::Array(items) => items
            .iter()
            .map(expr_from_json)
            .collect::<Result<Vec<_>>>()
            .map(Expr::List),
        _ => Err(malformed(format!("unsupported JSON value in program: {v}"))),
    }
}

/// Parse program text and enforce the expression budgets.
pub fn parse_text(text: &str) -> Result<Expr> {
    let json: Json = serde_json::from_str(text)
        .map_err(|err| malformed(format!("program text is not valid JSON: {err}")))?;
    let expr = expr_from_json(&json)?;

    let nodes = expr.node_count();
    let max_nodes = limits::max_expr_nodes();
    if nodes > max_nodes {
        return Err(RuntimeError::new(
            ErrorKind::Budget,
            format!("program has {nodes} nodes (max {max_nodes})"),
        ));
    }
    let depth = expr.max_depth();
    let max_depth = limits::max_expr_depth();
    if depth > max_depth {
        return Err(RuntimeError::new(
            ErrorKind::Budget,
            format!("program nests {depth} deep (max {max_depth})"),
        ));
    }
    Ok(expr)
}
