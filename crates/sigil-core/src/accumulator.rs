//! Generic container accumulator.
//!
//! Construction is staged: pick a container kind and element mapping, supply a
//! prefix, supply a suffix, then feed elements and finalize. Each element is
//! mapped and appended through the container kind's append capability; the
//! suffix is appended last, on finalize.

use crate::error::{ErrorKind, Result, RuntimeError};
use crate::reflect::{self, get_attr};
use crate::runtime::Runtime;
use crate::value::{Func, TypeKind, Value};

fn misuse(message: impl Into<String>) -> RuntimeError {
    RuntimeError::new(ErrorKind::Accumulator, message.into())
}

fn check_kind(kind: TypeKind, v: &Value, stage: &str) -> Result<()> {
    if v.kind() == kind {
        return Ok(());
    }
    Err(misuse(format!(
        "{stage} must be a {} value, got {}",
        kind.as_str(),
        v.kind().as_str()
    )))
}

#[derive(Debug, Clone)]
pub struct AccumulatorSpec {
    kind: TypeKind,
    append: Value,
    map: Value,
}

impl AccumulatorSpec {
    /// Resolve the append capability of `kind` and pair it with `map`.
    pub fn new(rt: &Runtime, kind: TypeKind, map: Value) -> Result<Self> {
        if !kind.is_sequence() {
            return Err(RuntimeError::type_mismatch(
                "accumulator",
                "a sequence kind",
                kind.as_str(),
            ));
        }
        if !map.is_callable() {
            return Err(RuntimeError::type_mismatch(
                "accumulator map",
                "a callable",
                map.kind().as_str(),
            ));
        }
        let append_id = rt.capability(TypeKind::Carrier, rt.offsets().append)?;
        let append = get_attr(&Value::Type(kind), append_id)?;
        Ok(AccumulatorSpec { kind, append, map })
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn with_prefix(&self, prefix: Value) -> Result<PrefixedAccumulator> {
        check_kind(self.kind, &prefix, "prefix")?;
        Ok(PrefixedAccumulator {
            spec: self.clone(),
            prefix,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PrefixedAccumulator {
    spec: AccumulatorSpec,
    prefix: Value,
}

impl PrefixedAccumulator {
    pub fn with_suffix(&self, suffix: Value) -> Result<Accumulator> {
        check_kind(self.spec.kind, &suffix, "suffix")?;
        Ok(Accumulator {
            spec: self.spec.clone(),
            acc: self.prefix.clone(),
            suffix,
        })
    }
}

/// An accumulator past initialization. `add` returns a new accumulator.
#[derive(Debug, Clone)]
pub struct Accumulator {
    spec: AccumulatorSpec,
    acc: Value,
    suffix: Value,
}

impl Accumulator {
    pub fn add(&self, element: Value) -> Result<Accumulator> {
        let mapped = self.spec.map.call(vec![element])?;
        let acc = self.spec.append.call(vec![self.acc.clone(), mapped])?;
        Ok(Accumulator {
            spec: self.spec.clone(),
            acc,
            suffix: self.suffix.clone(),
        })
    }

    pub fn extend(&self, elements: impl IntoIterator<Item = Value>) -> Result<Accumulator> {
        elements
            .into_iter()
            .try_fold(self.clone(), |acc, e| acc.add(e))
    }

    pub fn finish(&self) -> Result<Value> {
        self.spec
            .append
            .call(vec![self.acc.clone(), self.suffix.clone()])
    }
}

/// Splits stage arguments into "none" or "exactly one".
fn at_most_one(stage: &str, args: Vec<Value>) -> Result<Option<Value>> {
    let mut it = args.into_iter();
    match (it.next(), it.next()) {
        (None, _) => Ok(None),
        (Some(v), None) => Ok(Some(v)),
        (Some(_), Some(_)) => Err(misuse(format!(
            "{stage} takes one value at a time, got {}",
            2 + it.count()
        ))),
    }
}

/// The curried form: `build_map(kind)(map)(prefix)(suffix)(e)...()`.
pub fn build_map(rt: &Runtime, kind: TypeKind) -> Result<Value> {
    let rt = rt.clone();
    Ok(Value::Func(Func::new("build_map", move |args| {
        let map = match at_most_one("map stage", args)? {
            Some(map) => map,
            None => return Err(misuse("map stage requires an element mapping")),
        };
        let spec = AccumulatorSpec::new(&rt, kind, map)?;
        Ok(prefix_stage(spec))
    })))
}

fn prefix_stage(spec: AccumulatorSpec) -> Value {
    Value::Func(Func::new("build_map.prefix", move |args| {
        match at_most_one("prefix stage", args)? {
            Some(prefix) => Ok(suffix_stage(spec.with_prefix(prefix)?)),
            None => Err(misuse("prefix stage requires a prefix value")),
        }
    }))
}

fn suffix_stage(pending: PrefixedAccumulator) -> Value {
    Value::Func(Func::new("build_map.suffix", move |args| {
        match at_most_one("suffix stage", args)? {
            Some(suffix) => Ok(element_stage(pending.with_suffix(suffix)?)),
            None => Err(misuse("suffix stage requires a suffix value")),
        }
    }))
}

fn element_stage(acc: Accumulator) -> Value {
    Value::Func(Func::new("build_map.accumulate", move |args| {
        match at_most_one("accumulate stage", args)? {
            Some(element) => Ok(element_stage(acc.add(element)?)),
            None => acc.finish(),
        }
    }))
}

fn identity() -> Value {
    Value::Func(Func::new("identity", reflect::identity))
}

fn ready(rt: &Runtime, kind: TypeKind, map: Value, empty: Value) -> Result<Value> {
    let acc = AccumulatorSpec::new(rt, kind, map)?
        .with_prefix(empty.clone())?
        .with_suffix(empty)?;
    Ok(element_stage(acc))
}

/// Code points in, string out.
pub fn build_string(rt: &Runtime) -> Result<Value> {
    let chr = Value::Func(Func::new("chr", reflect::chr));
    ready(rt, TypeKind::Str, chr, Value::str(""))
}

pub fn build_list(rt: &Runtime) -> Result<Value> {
    ready(rt, TypeKind::List, identity(), Value::List(Vec::new()))
}

pub fn build_tuple(rt: &Runtime) -> Result<Value> {
    ready(rt, TypeKind::Tuple, identity(), Value::Tuple(Vec::new()))
}

/// Feed `elements` to an accumulate-stage value and finalize.
pub fn feed(stage: &Value, elements: impl IntoIterator<Item = Value>) -> Result<Value> {
    let mut current = stage.clone();
    for e in elements {
        current = current.call(vec![e])?;
    }
    current.call(vec![])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(s: &str) -> Vec<Value> {
        s.chars().map(|c| Value::Int(c as i64)).collect()
    }

    #[test]
    fn string_from_code_points() {
        let rt = Runtime::default();
        let s = build_string(&rt).unwrap();
        assert_eq!(feed(&s, codes("AB")).unwrap(), Value::str("AB"));
        assert_eq!(feed(&s, []).unwrap(), Value::str(""));
    }

    #[test]
    fn list_with_identity_mapping() {
        let rt = Runtime::default();
        let l = build_list(&rt).unwrap();
        let out = feed(&l, [Value::Int(1), Value::Int(2), Value::Int(3)]).unwrap();
        assert_eq!(
            out,
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn curried_form_appends_suffix_on_finish() {
        let rt = Runtime::default();
        let chr = Value::Func(Func::new("chr", reflect::chr));
        let stage = build_map(&rt, TypeKind::Str)
            .and_then(|f| f.call(vec![chr]))
            .and_then(|f| f.call(vec![Value::str("<")]))
            .and_then(|f| f.call(vec![Value::str(">")]))
            .unwrap();
        assert_eq!(feed(&stage, codes("hi")).unwrap(), Value::str("<hi>"));
    }

    #[test]
    fn partial_accumulators_are_reusable() {
        let rt = Runtime::default();
        let base = build_string(&rt)
            .and_then(|s| s.call(vec![Value::Int('a' as i64)]))
            .unwrap();
        let ab = base.call(vec![Value::Int('b' as i64)]).unwrap();
        let ac = base.call(vec![Value::Int('c' as i64)]).unwrap();
        assert_eq!(ab.call(vec![]).unwrap(), Value::str("ab"));
        assert_eq!(ac.call(vec![]).unwrap(), Value::str("ac"));
        assert_eq!(base.call(vec![]).unwrap(), Value::str("a"));
    }

    #[test]
    fn skipping_prefix_or_suffix_is_rejected() {
        let rt = Runtime::default();
        let prefix = build_map(&rt, TypeKind::List)
            .and_then(|f| f.call(vec![identity()]))
            .unwrap();
        assert_eq!(
            prefix.call(vec![]).unwrap_err().kind,
            ErrorKind::Accumulator
        );
        let suffix = prefix.call(vec![Value::List(vec![])]).unwrap();
        assert_eq!(
            suffix.call(vec![]).unwrap_err().kind,
            ErrorKind::Accumulator
        );
    }

    #[test]
    fn elements_after_finalize_are_rejected() {
        let rt = Runtime::default();
        let done = feed(&build_string(&rt).unwrap(), codes("x")).unwrap();
        let err = done.call(vec![Value::Int(65)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn mismatched_prefix_kind_is_rejected() {
        let rt = Runtime::default();
        let spec = AccumulatorSpec::new(&rt, TypeKind::Str, identity()).unwrap();
        let err = spec.with_prefix(Value::List(vec![])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Accumulator);
    }

    #[test]
    fn builder_api_matches_curried_form() {
        let rt = Runtime::default();
        let acc = AccumulatorSpec::new(&rt, TypeKind::Tuple, identity())
            .and_then(|s| s.with_prefix(Value::Tuple(vec![Value::Int(0)])))
            .and_then(|p| p.with_suffix(Value::Tuple(vec![Value::Int(9)])))
            .and_then(|a| a.extend([Value::Int(1), Value::Int(2)]))
            .unwrap();
        assert_eq!(
            acc.finish().unwrap(),
            Value::Tuple(vec![Value::Int(0), Value::Int(1), Value::Int(2), Value::Int(9)])
        );
    }

    #[test]
    fn non_sequence_kinds_cannot_accumulate() {
        let rt = Runtime::default();
        let err = AccumulatorSpec::new(&rt, TypeKind::Int, identity()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
    }
}
