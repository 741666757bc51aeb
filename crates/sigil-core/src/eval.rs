//! Evaluator for program text.
//!
//! Every identifier read and every `set` goes through the runtime's capability
//! resolved accessors, so programs see the same environment as the host side.
//!
//! Forms:
//! - `["quote", s]` string literal
//! - `["none"]`
//! - `["begin", e...]` value of the last expression
//! - `["set", name, e]` bind and return the value
//! - `["prim", name]` a built-in primitive
//! - `["type", kind]` a type value
//! - `["cap", type, offset]` identifier at `offset` in the type's capability table
//! - `["attr", target, id]` capability lookup
//! - `["apply", f, a...]`
//! - `["absorb", node, e...]` feed operands one at a time
//! - `["commit", node]`
//! - `["list", e...]`

use crate::ast::{parse_text, Expr};
use crate::combinator::Combinator;
use crate::error::{ErrorKind, Result, RuntimeError};
use crate::language::limits;
use crate::reflect::{self, get_attr};
use crate::runtime::Runtime;
use crate::value::{Func, TypeKind, Value};

pub const PRIMITIVES: &[&str] = &[
    "args",
    "call",
    "chr",
    "compose",
    "eval_text",
    "identity",
    "list_of",
    "negate",
    "slice",
];

fn eval_error(message: String) -> RuntimeError {
    RuntimeError::new(ErrorKind::Eval, message)
}

/// Built-in primitive by name.
pub fn primitive(rt: &Runtime, name: &str) -> Result<Value> {
    let node = |c: Combinator| -> Result<Value> { Ok(Value::Combinator(Box::new(c))) };
    match name {
        "compose" => node(Combinator::Compose(Vec::new())),
        "args" => node(Combinator::Args(Vec::new())),
        "call" => node(Combinator::Call(Vec::new())),
        "negate" => node(Combinator::Negate(Vec::new())),
        "list_of" => node(Combinator::ListOf(Vec::new())),
        "chr" => Ok(Value::Func(Func::new("chr", reflect::chr))),
        "identity" => Ok(Value::Func(Func::new("identity", reflect::identity))),
        "slice" => Ok(Value::Func(Func::new("slice", reflect::make_slice))),
        "eval_text" => {
            let rt = rt.clone();
            Ok(Value::Func(Func::new("eval_text", move |args| {
                match args.as_slice() {
                    [text] => eval_text(&rt, text.expect_str("eval_text")?),
                    _ => Err(RuntimeError::arity("eval_text", "1", args.len())),
                }
            })))
        }
        _ => Err(eval_error(format!("unknown primitive: {name:?}"))),
    }
}

pub fn eval_text(rt: &Runtime, text: &str) -> Result<Value> {
    let max_depth = limits::max_expr_depth();
    let _frame = rt.enter_eval(max_depth)?;
    let expr = parse_text(text)?;
    Evaluator { rt, max_depth }.eval(&expr)
}

struct Evaluator<'a> {
    rt: &'a Runtime,
    max_depth: usize,
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expr) -> Result<Value> {
        let _frame = self.rt.enter_eval(self.max_depth)?;
        self.eval_inner(expr)
    }

    fn eval_all(&self, exprs: &[Expr]) -> Result<Vec<Value>> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    fn eval_inner(&self, expr: &Expr) -> Result<Value> {
        let items = match expr {
            Expr::Int(i) => return Ok(Value::Int(*i)),
            Expr::Ident(name) => return self.rt.get_value(name),
            Expr::List(items) => items,
        };
        let Some((head, rest)) = items.split_first() else {
            return Err(eval_error("empty form".to_string()));
        };
        let Some(head) = head.as_ident() else {
            return Err(eval_error("form head must be an identifier".to_string()));
        };

        match (head, rest) {
            ("quote", [Expr::Ident(s)]) => Ok(Value::str(s.as_str())),
            ("none", []) => Ok(Value::None),
            ("begin", body) => {
                let mut last = Value::None;
                for e in body {
                    last = self.eval(e)?;
                }
                Ok(last)
            }
            ("set", [Expr::Ident(name), value]) => {
                let value = self.eval(value)?;
                self.rt.set_value(name, value)
            }
            ("prim", [Expr::Ident(name)]) => primitive(self.rt, name),
            ("type", [Expr::Ident(name)]) => TypeKind::parse(name)
                .map(Value::Type)
                .ok_or_else(|| eval_error(format!("unknown type kind: {name:?}"))),
            ("cap", [target, offset]) => {
                let kind = match self.eval(target)? {
                    Value::Type(k) => k,
                    other => {
                        return Err(RuntimeError::type_mismatch(
                            "cap",
                            "a type",
                            other.kind().as_str(),
                        ))
                    }
                };
                let offset = self.eval(offset)?.expect_int("cap offset")?;
                let offset = usize::try_from(offset)
                    .map_err(|_| eval_error(format!("negative capability offset: {offset}")))?;
                Ok(Value::str(self.rt.capability(kind, offset)?))
            }
            ("attr", [target, cap]) => {
                let target = self.eval(target)?;
                let cap = self.eval(cap)?;
                get_attr(&target, cap.expect_str("attr")?)
            }
            ("apply", [f, args @ ..]) => {
                let f = self.eval(f)?;
                let args = self.eval_all(args)?;
                f.call(args)
            }
            ("absorb", [node, operands @ ..]) => {
                let mut node = self.eval(node)?;
                for op in operands {
                    let op = self.eval(op)?;
                    node = node.call(vec![op])?;
                }
                Ok(node)
            }
            ("commit", [node]) => self.eval(node)?.call(Vec::new()),
            ("list", elems) => Ok(Value::List(self.eval_all(elems)?)),
            (
                "quote" | "none" | "set" | "prim" | "type" | "cap" | "attr" | "apply" | "absorb"
                | "commit",
                _,
            ) => Err(eval_error(format!(
                "malformed {head:?} form: {}",
                expr.to_json()
            ))),
            _ => Err(eval_error(format!("unknown form: {head:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_read_back() {
        let rt = Runtime::default();
        let v = rt.eval_text(r#"["begin",["set","x",7],"x"]"#).unwrap();
        assert_eq!(v, Value::Int(7));
        assert_eq!(rt.get_value("x").unwrap(), Value::Int(7));
    }

    #[test]
    fn identifiers_must_be_bound() {
        let rt = Runtime::default();
        let err = rt.eval_text(r#""missing""#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unbound);
    }

    #[test]
    fn combinator_forms() {
        let rt = Runtime::default();
        let v = rt
            .eval_text(r#"["commit",["absorb",["prim","list_of"],1,["quote","a"],["none"]]]"#)
            .unwrap();
        assert_eq!(
            v,
            Value::List(vec![Value::Int(1), Value::str("a"), Value::None])
        );
    }

    #[test]
    fn capability_lookup_by_offset() {
        let rt = Runtime::default();
        let add = r#"["attr",["type","str"],["cap",["type","carrier"],0]]"#;
        let program = format!(r#"["apply",{add},["quote","a"],["quote","b"]]"#);
        let v = rt.eval_text(&program).unwrap();
        assert_eq!(v, Value::str("ab"));
    }

    #[test]
    fn nested_eval_text_shares_the_environment() {
        let rt = Runtime::default();
        rt.set_value("inner", Value::str(r#"["set","y",5]"#)).unwrap();
        rt.eval_text(r#"["apply",["prim","eval_text"],"inner"]"#).unwrap();
        assert_eq!(rt.get_value("y").unwrap(), Value::Int(5));
    }

    #[test]
    fn malformed_and_unknown_forms() {
        let rt = Runtime::default();
        for text in [
            r#"[]"#,
            r#"[1,2]"#,
            r#"["set",1,2]"#,
            r#"["frobnicate"]"#,
            r#"["prim","nope"]"#,
        ] {
            assert_eq!(
                rt.eval_text(text).unwrap_err().kind,
                ErrorKind::Eval,
                "{text}"
            );
        }
    }

    #[test]
    fn self_evaluating_text_hits_the_depth_budget() {
        let rt = Runtime::default();
        let program = r#"["apply",["prim","eval_text"],"loop"]"#;
        rt.set_value("loop", Value::str(program)).unwrap();
        let err = rt.eval_text(program).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Budget);

        // Frames unwind on error; the runtime stays usable.
        assert_eq!(rt.eval_text("7").unwrap(), Value::Int(7));
    }

    #[test]
    fn every_listed_primitive_resolves() {
        let rt = Runtime::default();
        for name in PRIMITIVES {
            assert!(primitive(&rt, name).is_ok(), "{name}");
        }
    }
}
