//! Native bindings behind capability identifiers.
//!
//! `get_attr` is the only way the rest of the runtime turns an identifier into
//! behavior: attribute capabilities yield their value, method capabilities yield a
//! function bound to the target. On a type value, capabilities the described kind
//! declares come back unbound (the receiver is the first argument).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::capability::{declared_capabilities, declares};
use crate::error::{ErrorKind, Result, RuntimeError};
use crate::language::limits;
use crate::value::{Func, SliceSpec, TypeKind, Value};

/// Universal capabilities with a native binding on every kind.
const UNIVERSAL_METHODS: &[&str] = &[
    "Clone", "Debug", "Display", "Eq", "Hash", "Identity", "Ne", "PartialEq", "Repr", "SizeOf",
    "ToOwned", "ToString",
];

fn unsupported(kind: TypeKind, cap: &str) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::Capability,
        format!("capability {cap:?} has no native binding on {}", kind.as_str()),
    )
}

/// Look up `cap` on `target`.
pub fn get_attr(target: &Value, cap: &str) -> Result<Value> {
    if let Some(v) = attribute(target, cap) {
        return Ok(v);
    }

    if let Value::Type(described) = target {
        let described = *described;
        if declares(described, cap) {
            return Ok(Value::Func(unbound(described, cap)));
        }
    }

    let kind = target.kind();
    if !UNIVERSAL_METHODS.iter().any(|m| *m == cap) && !declares(kind, cap) {
        return Err(unsupported(kind, cap));
    }
    let this = target.clone();
    let cap_owned = cap.to_string();
    Ok(Value::Func(Func::new(
        &format!("{}.{cap}", kind.as_str()),
        move |args| call_method(&this, &cap_owned, args),
    )))
}

fn attribute(target: &Value, cap: &str) -> Option<Value> {
    match (target, cap) {
        (_, "Class") => Some(Value::Type(target.kind())),
        (_, "TypeId") => Some(Value::str(target.kind().as_str())),
        (Value::Type(k), "name") => Some(Value::str(k.as_str())),
        (Value::Type(k), "qualified_name") => Some(Value::str(format!("sigil::{}", k.as_str()))),
        (Value::Type(k), "size_hint") => {
            Some(Value::Int(declared_capabilities(*k).len() as i64))
        }
        (Value::Func(f), "name") => Some(Value::str(f.name())),
        (Value::Slice(s), "start") => Some(s.start.map_or(Value::None, Value::Int)),
        (Value::Slice(s), "stop") => Some(s.stop.map_or(Value::None, Value::Int)),
        (Value::Slice(s), "step") => Some(s.step.map_or(Value::None, Value::Int)),
        _ => None,
    }
}

fn unbound(described: TypeKind, cap: &str) -> Func {
    let name = format!("{}.{cap}", described.as_str());
    let cap = cap.to_string();
    if described == TypeKind::Bytes && cap == "from_hex" {
        return Func::new(&name, |args| match args.as_slice() {
            [hex] => bytes_from_hex(hex),
            _ => Err(RuntimeError::arity("bytes.from_hex", "1", args.len())),
        });
    }
    Func::new(&name.clone(), move |mut args| {
        if args.is_empty() {
            return Err(RuntimeError::arity(&name, "at least 1", 0));
        }
        let this = args.remove(0);
        if this.kind() != described {
            return Err(RuntimeError::type_mismatch(
                &name,
                described.as_str(),
                this.kind().as_str(),
            ));
        }
        call_method(&this, &cap, args)
    })
}

fn expect_args<const N: usize>(what: &str, args: Vec<Value>) -> Result<[Value; N]> {
    let got = args.len();
    args.try_into()
        .map_err(|_| RuntimeError::arity(what, &N.to_string(), got))
}

fn call_method(this: &Value, cap: &str, args: Vec<Value>) -> Result<Value> {
    let kind = this.kind();
    let what = format!("{}.{cap}", kind.as_str());
    match cap {
        "Clone" | "ToOwned" | "Identity" => {
            expect_args::<0>(&what, args)?;
            return Ok(this.clone());
        }
        "Repr" | "Debug" => {
            expect_args::<0>(&what, args)?;
            return Ok(Value::Str(this.repr()));
        }
        "ToString" | "Display" => {
            expect_args::<0>(&what, args)?;
            return Ok(Value::Str(this.to_string()));
        }
        "Eq" | "PartialEq" => {
            let [other] = expect_args(&what, args)?;
            return Ok(Value::Bool(*this == other));
        }
        "Ne" => {
            let [other] = expect_args(&what, args)?;
            return Ok(Value::Bool(*this != other));
        }
        "Hash" => {
            expect_args::<0>(&what, args)?;
            let mut h = DefaultHasher::new();
            this.repr().hash(&mut h);
            return Ok(Value::Int(h.finish() as i64));
        }
        "SizeOf" => {
            expect_args::<0>(&what, args)?;
            return Ok(Value::Int(std::mem::size_of::<Value>() as i64));
        }
        _ => {}
    }

    match (this, cap) {
        (_, "Add") => {
            let [rhs] = expect_args(&what, args)?;
            append(this, rhs)
        }
        (_, "GetItem") => {
            let [key] = expect_args(&what, args)?;
            get_item(this, &key)
        }
        (Value::Namespace(env), "SetItem") => {
            let [name, value] = expect_args(&what, args)?;
            Ok(env.store(name.expect_str(&what)?, value))
        }
        (Value::List(items), "SetItem") => {
            let [index, value] = expect_args(&what, args)?;
            let at = normalize_index(index.expect_int(&what)?, items.len())
                .ok_or_else(|| index_error(&what, &index))?;
            let mut out = items.clone();
            out[at] = value;
            Ok(Value::List(out))
        }
        (_, "Len") => {
            expect_args::<0>(&what, args)?;
            Ok(Value::Int(elements(this)?.len() as i64))
        }
        (_, "Iter") => {
            expect_args::<0>(&what, args)?;
            Ok(Value::List(elements(this)?))
        }
        (Value::Namespace(env), "Contains") => {
            let [name] = expect_args(&what, args)?;
            Ok(Value::Bool(env.contains(name.expect_str(&what)?)))
        }
        (Value::Str(s), "Contains") => {
            let [needle] = expect_args(&what, args)?;
            Ok(Value::Bool(s.contains(needle.expect_str(&what)?)))
        }
        (_, "Contains") => {
            let [needle] = expect_args(&what, args)?;
            Ok(Value::Bool(elements(this)?.contains(&needle)))
        }
        (_, "Mul") => {
            let [rhs] = expect_args(&what, args)?;
            multiply(this, &rhs)
        }
        (Value::Int(i), "Neg") => {
            expect_args::<0>(&what, args)?;
            i.checked_neg()
                .map(Value::Int)
                .ok_or_else(|| RuntimeError::new(ErrorKind::Type, format!("cannot negate {i}")))
        }
        (Value::Int(i), "Sub") => {
            let [rhs] = expect_args(&what, args)?;
            i.checked_sub(rhs.expect_int(&what)?)
                .map(Value::Int)
                .ok_or_else(|| RuntimeError::new(ErrorKind::Type, "int overflow".to_string()))
        }
        (Value::Int(i), "abs") => {
            expect_args::<0>(&what, args)?;
            i.checked_abs()
                .map(Value::Int)
                .ok_or_else(|| RuntimeError::new(ErrorKind::Type, "int overflow".to_string()))
        }
        (Value::Int(i), "signum") => Ok(Value::Int(i.signum())),
        (Value::Bool(b), "Not") => Ok(Value::Bool(!b)),
        (Value::Bool(b), "And") => {
            let [rhs] = expect_args(&what, args)?;
            Ok(Value::Bool(*b && truthy(&rhs)))
        }
        (Value::Bool(b), "Or") => {
            let [rhs] = expect_args(&what, args)?;
            Ok(Value::Bool(*b || truthy(&rhs)))
        }
        (Value::Str(s), _) => str_method(s, cap, &what, args),
        (Value::Bytes(b), _) => bytes_method(b, cap, &what, args),
        (Value::List(items), "append") => {
            let [item] = expect_args(&what, args)?;
            let mut out = items.clone();
            out.push(item);
            Ok(Value::List(out))
        }
        (Value::List(items), "reverse") => Ok(Value::List(items.iter().rev().cloned().collect())),
        (Value::List(items) | Value::Tuple(items), "count") => {
            let [needle] = expect_args(&what, args)?;
            Ok(Value::Int(items.iter().filter(|v| **v == needle).count() as i64))
        }
        (Value::List(items) | Value::Tuple(items), "index") => {
            let [needle] = expect_args(&what, args)?;
            items
                .iter()
                .position(|v| *v == needle)
                .map(|i| Value::Int(i as i64))
                .ok_or_else(|| {
                    RuntimeError::new(ErrorKind::Type, format!("{what}: value not present"))
                })
        }
        (Value::Namespace(env), "keys") => Ok(Value::List(
            env.names().into_iter().map(Value::Str).collect(),
        )),
        (Value::Namespace(env), "values") => {
            let values = env
                .names()
                .iter()
                .map(|n| env.lookup(n))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::List(values))
        }
        (Value::Namespace(env), "get") => match args.as_slice() {
            [name] => Ok(env.lookup(name.expect_str(&what)?).unwrap_or(Value::None)),
            [name, default] => Ok(env
                .lookup(name.expect_str(&what)?)
                .unwrap_or_else(|_| default.clone())),
            _ => Err(RuntimeError::arity(&what, "1 or 2", args.len())),
        },
        (Value::Func(f), "Call") => f.call(args),
        (Value::Combinator(_), "Call") => this.call(args),
        (Value::Combinator(node), "absorb") => {
            let [operand] = expect_args(&what, args)?;
            Ok(Value::Combinator(Box::new(node.absorb(operand)?)))
        }
        (Value::Combinator(node), "commit") => {
            expect_args::<0>(&what, args)?;
            node.commit()
        }
        _ => Err(unsupported(kind, cap)),
    }
}

fn str_method(s: &str, cap: &str, what: &str, args: Vec<Value>) -> Result<Value> {
    match cap {
        "casefold" => {
            expect_args::<0>(what, args)?;
            Ok(Value::str(caseless::default_case_fold_str(s)))
        }
        "lower" => {
            expect_args::<0>(what, args)?;
            Ok(Value::str(s.to_lowercase()))
        }
        "upper" => {
            expect_args::<0>(what, args)?;
            Ok(Value::str(s.to_uppercase()))
        }
        "capitalize" => {
            expect_args::<0>(what, args)?;
            let mut chars = s.chars();
            Ok(Value::str(match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }))
        }
        "join" => {
            let [parts] = expect_args(what, args)?;
            let parts = elements(&parts)?;
            let mut pieces = Vec::with_capacity(parts.len());
            for p in &parts {
                pieces.push(p.expect_str(what)?);
            }
            Ok(Value::str(pieces.join(s)))
        }
        "strip" => {
            expect_args::<0>(what, args)?;
            Ok(Value::str(s.trim()))
        }
        "split" => match args.as_slice() {
            [] => Ok(Value::List(s.split_whitespace().map(Value::str).collect())),
            [sep] => Ok(Value::List(
                s.split(sep.expect_str(what)?).map(Value::str).collect(),
            )),
            _ => Err(RuntimeError::arity(what, "0 or 1", args.len())),
        },
        "lines" => Ok(Value::List(s.lines().map(Value::str).collect())),
        "chars" => Ok(Value::List(
            s.chars().map(|c| Value::Str(c.to_string())).collect(),
        )),
        "replace" => {
            let [from, to] = expect_args(what, args)?;
            Ok(Value::str(s.replace(from.expect_str(what)?, to.expect_str(what)?)))
        }
        "starts_with" => {
            let [p] = expect_args(what, args)?;
            Ok(Value::Bool(s.starts_with(p.expect_str(what)?)))
        }
        "ends_with" => {
            let [p] = expect_args(what, args)?;
            Ok(Value::Bool(s.ends_with(p.expect_str(what)?)))
        }
        "find" | "rfind" => {
            let [p] = expect_args(what, args)?;
            let p = p.expect_str(what)?;
            let byte_at = if cap == "find" { s.find(p) } else { s.rfind(p) };
            Ok(Value::Int(
                byte_at.map_or(-1, |b| s[..b].chars().count() as i64),
            ))
        }
        "count" => {
            let [p] = expect_args(what, args)?;
            Ok(Value::Int(s.matches(p.expect_str(what)?).count() as i64))
        }
        "repeat" => {
            let [n] = expect_args(what, args)?;
            let n = repeat_count(what, s.len(), &n)?;
            Ok(Value::str(s.repeat(n)))
        }
        "encode" => Ok(Value::Bytes(s.as_bytes().to_vec())),
        "is_empty" => Ok(Value::Bool(s.is_empty())),
        "is_ascii" => Ok(Value::Bool(s.is_ascii())),
        "is_alphabetic" => Ok(Value::Bool(!s.is_empty() && s.chars().all(char::is_alphabetic))),
        "is_alphanumeric" => Ok(Value::Bool(
            !s.is_empty() && s.chars().all(char::is_alphanumeric),
        )),
        "is_numeric" => Ok(Value::Bool(!s.is_empty() && s.chars().all(char::is_numeric))),
        "is_whitespace" => Ok(Value::Bool(!s.is_empty() && s.chars().all(char::is_whitespace))),
        "is_lowercase" => Ok(Value::Bool(
            s.chars().any(char::is_lowercase) && !s.chars().any(char::is_uppercase),
        )),
        "is_uppercase" => Ok(Value::Bool(
            s.chars().any(char::is_uppercase) && !s.chars().any(char::is_lowercase),
        )),
        _ => Err(unsupported(TypeKind::Str, cap)),
    }
}

fn bytes_method(b: &[u8], cap: &str, what: &str, args: Vec<Value>) -> Result<Value> {
    match cap {
        "decode" => {
            expect_args::<0>(what, args)?;
            String::from_utf8(b.to_vec()).map(Value::Str).map_err(|err| {
                RuntimeError::new(ErrorKind::Payload, format!("bytes are not UTF-8: {err}"))
            })
        }
        "from_hex" => {
            let [hex] = expect_args(what, args)?;
            bytes_from_hex(&hex)
        }
        "hex" => Ok(Value::str(hex::encode(b))),
        "to_vec" => Ok(Value::List(b.iter().map(|&x| Value::Int(x.into())).collect())),
        "is_ascii" => Ok(Value::Bool(b.is_ascii())),
        "trim_ascii" => Ok(Value::Bytes(b.trim_ascii().to_vec())),
        _ => Err(unsupported(TypeKind::Bytes, cap)),
    }
}

fn bytes_from_hex(hex: &Value) -> Result<Value> {
    let text = hex.expect_str("bytes.from_hex")?;
    hex::decode(text.trim())
        .map(Value::Bytes)
        .map_err(|err| RuntimeError::new(ErrorKind::Payload, format!("invalid hex payload: {err}")))
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::None => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Str(s) => !s.is_empty(),
        Value::Bytes(b) => !b.is_empty(),
        Value::List(items) | Value::Tuple(items) => !items.is_empty(),
        _ => true,
    }
}

/// The elements of a sequence, as values.
pub(crate) fn elements(v: &Value) -> Result<Vec<Value>> {
    match v {
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        Value::Bytes(b) => Ok(b.iter().map(|&x| Value::Int(x.into())).collect()),
        Value::List(items) | Value::Tuple(items) => Ok(items.clone()),
        Value::Namespace(env) => Ok(env.names().into_iter().map(Value::Str).collect()),
        other => Err(RuntimeError::type_mismatch(
            "iteration",
            "a sequence",
            other.kind().as_str(),
        )),
    }
}

/// Rebuild a sequence of the same kind as `like` from selected elements.
fn rebuild(like: &Value, items: Vec<Value>) -> Result<Value> {
    match like {
        Value::Str(_) => {
            let mut out = String::new();
            for item in &items {
                out.push_str(item.expect_str("str rebuild")?);
            }
            Ok(Value::Str(out))
        }
        Value::Bytes(_) => {
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                let byte = u8::try_from(item.expect_int("bytes rebuild")?).map_err(|_| {
                    RuntimeError::new(ErrorKind::Type, "byte out of range".to_string())
                })?;
                out.push(byte);
            }
            Ok(Value::Bytes(out))
        }
        Value::Tuple(_) => Ok(Value::Tuple(items)),
        _ => Ok(Value::List(items)),
    }
}

fn normalize_index(i: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let at = if i < 0 { i + len } else { i };
    (0..len).contains(&at).then_some(at as usize)
}

fn index_error(what: &str, key: &Value) -> RuntimeError {
    RuntimeError::new(ErrorKind::Type, format!("{what}: index {key} out of range"))
}

fn get_item(this: &Value, key: &Value) -> Result<Value> {
    if let Value::Namespace(env) = this {
        return env.lookup(key.expect_str("namespace lookup")?);
    }
    if !this.kind().is_sequence() {
        return Err(unsupported(this.kind(), "GetItem"));
    }
    let items = elements(this)?;
    match key {
        Value::Int(i) => normalize_index(*i, items.len())
            .map(|at| items[at].clone())
            .ok_or_else(|| index_error(this.kind().as_str(), key)),
        Value::Slice(spec) => {
            let picked = spec
                .indices(items.len())?
                .into_iter()
                .map(|at| items[at].clone())
                .collect();
            rebuild(this, picked)
        }
        other => Err(RuntimeError::type_mismatch(
            "sequence index",
            "int or slice",
            other.kind().as_str(),
        )),
    }
}

/// The append capability: concatenation for like containers, push for elements.
fn append(lhs: &Value, rhs: Value) -> Result<Value> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(b)
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::new(ErrorKind::Type, "int overflow".to_string())),
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        (Value::Bytes(a), Value::Bytes(b)) => {
            Ok(Value::Bytes([a.as_slice(), b.as_slice()].concat()))
        }
        (Value::List(a), Value::List(b)) => Ok(Value::List([a.as_slice(), b.as_slice()].concat())),
        (Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Value::Tuple([a.as_slice(), b.as_slice()].concat()))
        }
        (Value::List(a), item) => {
            let mut out = a.clone();
            out.push(item);
            Ok(Value::List(out))
        }
        (Value::Tuple(a), item) => {
            let mut out = a.clone();
            out.push(item);
            Ok(Value::Tuple(out))
        }
        (lhs, rhs) => Err(RuntimeError::new(
            ErrorKind::Type,
            format!(
                "cannot append {} to {}",
                rhs.kind().as_str(),
                lhs.kind().as_str()
            ),
        )),
    }
}

fn multiply(lhs: &Value, rhs: &Value) -> Result<Value> {
    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        return a
            .checked_mul(*b)
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::new(ErrorKind::Type, "int overflow".to_string()));
    }
    let items = elements(lhs)?;
    let times = repeat_count("repeat", items.len(), rhs)?;
    let repeated: Vec<Value> = (0..times).flat_map(|_| items.iter().cloned()).collect();
    rebuild(lhs, repeated)
}

/// Negative counts repeat zero times. An empty unit needs no repetitions at all.
fn repeat_count(what: &str, unit: usize, n: &Value) -> Result<usize> {
    let n = usize::try_from(n.expect_int(what)?).unwrap_or(0);
    if unit == 0 {
        return Ok(0);
    }
    let max = limits::max_sequence_len();
    match unit.checked_mul(n) {
        Some(total) if total <= max => Ok(n),
        _ => Err(RuntimeError::new(
            ErrorKind::Budget,
            format!("{what}: {n} repetitions of {unit} elements exceed {max}"),
        )),
    }
}

/// The slice constructor: up to three bounds, `none` for an open bound.
pub fn make_slice(args: Vec<Value>) -> Result<Value> {
    fn bound(v: &Value) -> Result<Option<i64>> {
        match v {
            Value::None => Ok(None),
            Value::Int(i) => Ok(Some(*i)),
            other => Err(RuntimeError::type_mismatch(
                "slice bound",
                "int or none",
                other.kind().as_str(),
            )),
        }
    }
    let spec = match args.as_slice() {
        [stop] => SliceSpec {
            start: None,
            stop: bound(stop)?,
            step: None,
        },
        [start, stop] => SliceSpec {
            start: bound(start)?,
            stop: bound(stop)?,
            step: None,
        },
        [start, stop, step] => SliceSpec {
            start: bound(start)?,
            stop: bound(stop)?,
            step: bound(step)?,
        },
        _ => return Err(RuntimeError::arity("slice", "1 to 3", args.len())),
    };
    Ok(Value::Slice(spec))
}

pub fn identity(args: Vec<Value>) -> Result<Value> {
    let [v] = expect_args("identity", args)?;
    Ok(v)
}

/// Unicode scalar value -> one-character string.
pub fn chr(args: Vec<Value>) -> Result<Value> {
    let [code] = expect_args("chr", args)?;
    let code = code.expect_int("chr")?;
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(|c| Value::Str(c.to_string()))
        .ok_or_else(|| {
            RuntimeError::new(ErrorKind::Type, format!("chr: {code} is not a Unicode scalar value"))
        })
}
