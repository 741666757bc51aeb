//! Accumulating combinators.
//!
//! A combinator node absorbs operands one at a time and produces its result when
//! committed. Absorbing never mutates: each step returns a new node, so a
//! partially-built node can be shared and extended in different directions.

use crate::error::{ErrorKind, Result, RuntimeError};
use crate::reflect::get_attr;
use crate::value::{Func, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Combinator {
    /// Commit yields `f(g(h(x)))` for operands absorbed as `f`, `g`, `h`.
    Compose(Vec<Value>),
    /// Commit yields a function applying its one argument to the captured operands.
    Args(Vec<Value>),
    /// Operands `[f, a...]`; commit applies `f` to `a...`.
    Call(Vec<Value>),
    /// Declared identifier of a type or function value.
    GetName {
        capability: &'static str,
        operands: Vec<Value>,
    },
    Negate(Vec<Value>),
    /// Indexes its one operand with `selector` through `index_capability`.
    Reverse {
        selector: Value,
        index_capability: &'static str,
        operands: Vec<Value>,
    },
    ListOf(Vec<Value>),
}

impl Combinator {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Combinator::Compose(_) => "compose",
            Combinator::Args(_) => "args",
            Combinator::Call(_) => "call",
            Combinator::GetName { .. } => "get_name",
            Combinator::Negate(_) => "negate",
            Combinator::Reverse { .. } => "reverse",
            Combinator::ListOf(_) => "list_of",
        }
    }

    pub fn operands(&self) -> &[Value] {
        match self {
            Combinator::Compose(ops)
            | Combinator::Args(ops)
            | Combinator::Call(ops)
            | Combinator::Negate(ops)
            | Combinator::ListOf(ops)
            | Combinator::GetName { operands: ops, .. }
            | Combinator::Reverse { operands: ops, .. } => ops,
        }
    }

    fn operands_mut(&mut self) -> &mut Vec<Value> {
        match self {
            Combinator::Compose(ops)
            | Combinator::Args(ops)
            | Combinator::Call(ops)
            | Combinator::Negate(ops)
            | Combinator::ListOf(ops)
            | Combinator::GetName { operands: ops, .. }
            | Combinator::Reverse { operands: ops, .. } => ops,
        }
    }

    fn max_operands(&self) -> Option<usize> {
        match self {
            Combinator::GetName { .. } | Combinator::Negate(_) | Combinator::Reverse { .. } => {
                Some(1)
            }
            _ => None,
        }
    }

    /// A new node with `operand` appended.
    pub fn absorb(&self, operand: Value) -> Result<Combinator> {
        let held = self.operands().len();
        if self.max_operands().is_some_and(|max| held >= max) {
            return Err(RuntimeError::arity(self.kind_name(), "exactly 1", held + 1));
        }
        let needs_callable = match self {
            Combinator::Compose(_) => true,
            Combinator::Call(_) => held == 0,
            _ => false,
        };
        if needs_callable && !operand.is_callable() {
            return Err(RuntimeError::type_mismatch(
                self.kind_name(),
                "a callable operand",
                operand.kind().as_str(),
            ));
        }
        let mut next = self.clone();
        next.operands_mut().push(operand);
        Ok(next)
    }

    pub fn absorb_all(&self, operands: impl IntoIterator<Item = Value>) -> Result<Combinator> {
        operands
            .into_iter()
            .try_fold(self.clone(), |node, op| node.absorb(op))
    }

    pub fn commit(&self) -> Result<Value> {
        match self {
            Combinator::Compose(stages) => Ok(Value::Func(compose(stages.clone()))),
            Combinator::Args(captured) => {
                let captured = captured.clone();
                Ok(Value::Func(Func::new("args", move |args| {
                    match <[Value; 1]>::try_from(args) {
                        Ok([target]) => target.call(captured.clone()),
                        Err(args) => Err(RuntimeError::arity("args", "1", args.len())),
                    }
                })))
            }
            Combinator::Call(ops) => match ops.split_first() {
                Some((f, args)) => f.call(args.to_vec()),
                None => Err(RuntimeError::arity("call", "at least 1", 0)),
            },
            Combinator::GetName {
                capability,
                operands,
            } => {
                let subject = match self.single(operands)? {
                    v @ (Value::Type(_) | Value::Func(_)) => v.clone(),
                    other => Value::Type(other.kind()),
                };
                get_attr(&subject, capability)
            }
            Combinator::Negate(ops) => {
                let n = self.single(ops)?.expect_int("negate")?;
                n.checked_neg().map(Value::Int).ok_or_else(|| {
                    RuntimeError::new(ErrorKind::Type, format!("cannot negate {n}"))
                })
            }
            Combinator::Reverse {
                selector,
                index_capability,
                operands,
            } => {
                let seq = self.single(operands)?;
                get_attr(seq, index_capability)?.call(vec![selector.clone()])
            }
            Combinator::ListOf(items) => Ok(Value::List(items.clone())),
        }
    }

    fn single<'a>(&self, ops: &'a [Value]) -> Result<&'a Value> {
        match ops {
            [v] => Ok(v),
            _ => Err(RuntimeError::arity(self.kind_name(), "exactly 1", ops.len())),
        }
    }
}

fn compose(stages: Vec<Value>) -> Func {
    Func::new("compose", move |args| {
        let mut pending = stages.iter().rev();
        let mut acc = match pending.next() {
            Some(innermost) => innermost.call(args)?,
            None => match <[Value; 1]>::try_from(args) {
                Ok([x]) => x,
                Err(args) => return Err(RuntimeError::arity("compose", "1", args.len())),
            },
        };
        for stage in pending {
            acc = stage.call(vec![acc])?;
        }
        Ok(acc)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::make_slice;
    use crate::value::TypeKind;

    fn add(n: i64) -> Value {
        Value::Func(Func::new("add", move |args| {
            Ok(Value::Int(args[0].expect_int("add")? + n))
        }))
    }

    fn double() -> Value {
        Value::Func(Func::new("double", |args| {
            Ok(Value::Int(args[0].expect_int("double")? * 2))
        }))
    }

    #[test]
    fn compose_applies_the_last_operand_first() {
        let f = Combinator::Compose(vec![])
            .absorb_all([add(1), double()])
            .unwrap()
            .commit()
            .unwrap();
        // add(1)(double(5))
        assert_eq!(f.call(vec![Value::Int(5)]).unwrap(), Value::Int(11));
    }

    #[test]
    fn empty_compose_is_identity() {
        let f = Combinator::Compose(vec![]).commit().unwrap();
        assert_eq!(f.call(vec![Value::str("x")]).unwrap(), Value::str("x"));
        assert_eq!(f.call(vec![]).unwrap_err().kind, ErrorKind::Arity);
    }

    #[test]
    fn compose_rejects_non_callables() {
        let err = Combinator::Compose(vec![]).absorb(Value::Int(1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn absorb_leaves_the_original_untouched() {
        let base = Combinator::ListOf(vec![Value::Int(1)]);
        let a = base.absorb(Value::Int(2)).unwrap();
        let b = base.absorb(Value::Int(3)).unwrap();
        assert_eq!(base.operands().len(), 1);
        assert_eq!(
            a.commit().unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(
            b.commit().unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(3)])
        );
    }

    #[test]
    fn args_captures_operands_for_a_later_target() {
        let captured = Combinator::Args(vec![])
            .absorb_all([Value::None, Value::None, Value::Int(-1)])
            .unwrap()
            .commit()
            .unwrap();
        let slice = Value::Func(Func::new("slice", make_slice));
        let sel = captured.call(vec![slice]).unwrap();
        assert_eq!(
            sel,
            make_slice(vec![Value::None, Value::None, Value::Int(-1)]).unwrap()
        );
    }

    #[test]
    fn call_without_function_is_an_arity_error() {
        assert_eq!(
            Combinator::Call(vec![]).commit().unwrap_err().kind,
            ErrorKind::Arity
        );
    }

    #[test]
    fn negate_checks_arity_and_overflow() {
        let one = Combinator::Negate(vec![]).absorb(Value::Int(1)).unwrap();
        assert_eq!(one.commit().unwrap(), Value::Int(-1));
        assert_eq!(
            one.absorb(Value::Int(2)).unwrap_err().kind,
            ErrorKind::Arity
        );
        let min = Combinator::Negate(vec![Value::Int(i64::MIN)]);
        assert_eq!(min.commit().unwrap_err().kind, ErrorKind::Type);
    }

    #[test]
    fn get_name_of_values_types_and_functions() {
        let node = |v| Combinator::GetName {
            capability: "name",
            operands: vec![v],
        };
        assert_eq!(
            node(Value::Type(TypeKind::Bytes)).commit().unwrap(),
            Value::str("bytes")
        );
        assert_eq!(node(Value::Int(7)).commit().unwrap(), Value::str("int"));
        assert_eq!(node(double()).commit().unwrap(), Value::str("double"));
    }

    #[test]
    fn reverse_indexes_with_its_selector() {
        let node = Combinator::Reverse {
            selector: make_slice(vec![Value::None, Value::None, Value::Int(-1)]).unwrap(),
            index_capability: "GetItem",
            operands: vec![],
        };
        let out = node.absorb(Value::str("abc")).unwrap().commit().unwrap();
        assert_eq!(out, Value::str("cba"));
    }
}
