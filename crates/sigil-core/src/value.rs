use std::fmt;
use std::rc::Rc;

use crate::combinator::Combinator;
use crate::env::Environment;
use crate::error::{ErrorKind, Result, RuntimeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeKind {
    None,
    Bool,
    Int,
    Str,
    Bytes,
    List,
    Tuple,
    Slice,
    Type,
    Function,
    Combinator,
    Namespace,
    /// The minimal probe type: append, indexed-read and indexed-write only.
    Carrier,
}

impl TypeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeKind::None => "none",
            TypeKind::Bool => "bool",
            TypeKind::Int => "int",
            TypeKind::Str => "str",
            TypeKind::Bytes => "bytes",
            TypeKind::List => "list",
            TypeKind::Tuple => "tuple",
            TypeKind::Slice => "slice",
            TypeKind::Type => "type",
            TypeKind::Function => "function",
            TypeKind::Combinator => "combinator",
            TypeKind::Namespace => "namespace",
            TypeKind::Carrier => "carrier",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        TypeKind::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s.trim())
    }

    pub fn all() -> &'static [TypeKind] {
        &[
            TypeKind::None,
            TypeKind::Bool,
            TypeKind::Int,
            TypeKind::Str,
            TypeKind::Bytes,
            TypeKind::List,
            TypeKind::Tuple,
            TypeKind::Slice,
            TypeKind::Type,
            TypeKind::Function,
            TypeKind::Combinator,
            TypeKind::Namespace,
            TypeKind::Carrier,
        ]
    }

    pub fn is_sequence(self) -> bool {
        matches!(
            self,
            TypeKind::Str | TypeKind::Bytes | TypeKind::List | TypeKind::Tuple
        )
    }
}

type NativeFn = dyn Fn(Vec<Value>) -> Result<Value>;

/// A named native closure. Equality is identity.
#[derive(Clone)]
pub struct Func {
    name: Rc<str>,
    body: Rc<NativeFn>,
}

impl Func {
    pub fn new(name: &str, body: impl Fn(Vec<Value>) -> Result<Value> + 'static) -> Self {
        Func {
            name: Rc::from(name),
            body: Rc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: Vec<Value>) -> Result<Value> {
        (self.body)(args)
    }

    pub fn call1(&self, arg: Value) -> Result<Value> {
        (self.body)(vec![arg])
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

impl PartialEq for Func {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SliceSpec {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl SliceSpec {
    /// Positions selected from a sequence of `len` elements, in selection order.
    pub fn indices(&self, len: usize) -> Result<Vec<usize>> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(RuntimeError::new(
                ErrorKind::Type,
                "slice step must not be zero".to_string(),
            ));
        }
        let len = i64::try_from(len)
            .map_err(|_| RuntimeError::new(ErrorKind::Internal, "sequence too long".to_string()))?;
        let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };
        let clamp = |bound: i64| {
            if bound < 0 {
                (bound + len).max(lower)
            } else {
                bound.min(upper)
            }
        };
        let start = match self.start {
            Some(s) => clamp(s),
            None if step < 0 => upper,
            None => lower,
        };
        let stop = match self.stop {
            Some(s) => clamp(s),
            None if step < 0 => lower,
            None => upper,
        };

        let mut out = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            out.push(i as usize);
            i += step;
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Slice(SliceSpec),
    Type(TypeKind),
    Func(Func),
    Combinator(Box<Combinator>),
    Namespace(Environment),
}

impl Value {
    pub fn kind(&self) -> TypeKind {
        match self {
            Value::None => TypeKind::None,
            Value::Bool(_) => TypeKind::Bool,
            Value::Int(_) => TypeKind::Int,
            Value::Str(_) => TypeKind::Str,
            Value::Bytes(_) => TypeKind::Bytes,
            Value::List(_) => TypeKind::List,
            Value::Tuple(_) => TypeKind::Tuple,
            Value::Slice(_) => TypeKind::Slice,
            Value::Type(_) => TypeKind::Type,
            Value::Func(_) => TypeKind::Function,
            Value::Combinator(_) => TypeKind::Combinator,
            Value::Namespace(_) => TypeKind::Namespace,
        }
    }

    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn expect_str(&self, what: &str) -> Result<&str> {
        self.as_str()
            .ok_or_else(|| RuntimeError::type_mismatch(what, "str", self.kind().as_str()))
    }

    pub fn expect_int(&self, what: &str) -> Result<i64> {
        self.as_int()
            .ok_or_else(|| RuntimeError::type_mismatch(what, "int", self.kind().as_str()))
    }

    /// Apply this value to `args`.
    ///
    /// Functions run their body. Combinators follow the one-operand-at-a-time
    /// convention: one argument absorbs, no arguments commits.
    pub fn call(&self, mut args: Vec<Value>) -> Result<Value> {
        match self {
            Value::Func(f) => f.call(args),
            Value::Combinator(node) => match args.len() {
                0 => node.commit(),
                1 => {
                    let operand = args.pop().unwrap_or(Value::None);
                    Ok(Value::Combinator(Box::new(node.absorb(operand)?)))
                }
                n => Err(RuntimeError::arity(node.kind_name(), "0 or 1", n)),
            },
            other => Err(RuntimeError::new(
                ErrorKind::Type,
                format!("{} value is not callable", other.kind().as_str()),
            )),
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Func(_) | Value::Combinator(_))
    }

    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("{s:?}"),
            Value::Bytes(b) => format!("b{:?}", String::from_utf8_lossy(b)),
            other => other.to_string(),
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        f.write_str(&item.repr())?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("none"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Str(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&hex::encode(b)),
            Value::List(items) => {
                f.write_str("[")?;
                write_items(f, items)?;
                f.write_str("]")
            }
            Value::Tuple(items) => {
                f.write_str("(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Value::Slice(s) => {
                let part = |v: Option<i64>| v.map(|v| v.to_string()).unwrap_or_default();
                write!(f, "[{}:{}:{}]", part(s.start), part(s.stop), part(s.step))
            }
            Value::Type(k) => write!(f, "<type {}>", k.as_str()),
            Value::Func(func) => write!(f, "{func:?}"),
            Value::Combinator(node) => write!(f, "<combinator {}>", node.kind_name()),
            Value::Namespace(env) => write!(f, "<namespace of {} bindings>", env.len()),
        }
    }
}
