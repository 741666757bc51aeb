//! Capability probing.
//!
//! Every type kind declares the operations it supports. A probe merges the profile's
//! universal vocabulary with a kind's declared capabilities and sorts the result
//! bytewise; that order is the host's canonical reflection order, and positions in
//! it are what the rest of the runtime resolves against.

use std::collections::BTreeMap;

use sigil_hosts::ProfileId;

use crate::error::{ErrorKind, Result, RuntimeError};
use crate::value::TypeKind;

pub const CAP_APPEND: &str = "Add";
pub const CAP_INDEX_READ: &str = "GetItem";
pub const CAP_INDEX_WRITE: &str = "SetItem";

const CARRIER: &[&str] = &[CAP_APPEND, CAP_INDEX_READ, CAP_INDEX_WRITE];

const STR: &[&str] = &[
    "Add",
    "Contains",
    "GetItem",
    "Iter",
    "Len",
    "Mul",
    "capitalize",
    "casefold",
    "center",
    "char_indices",
    "chars",
    "count",
    "encode",
    "ends_with",
    "escape_debug",
    "escape_default",
    "expand_tabs",
    "find",
    "format",
    "index",
    "is_alphabetic",
    "is_alphanumeric",
    "is_ascii",
    "is_char_boundary",
    "is_empty",
    "is_lowercase",
    "is_numeric",
    "is_uppercase",
    "is_whitespace",
    "join",
    "lines",
    "lower",
    "repeat",
    "replace",
    "rfind",
    "split",
    "starts_with",
    "strip",
    "upper",
];

const BYTES: &[&str] = &[
    "Add",
    "Contains",
    "Deref",
    "GetItem",
    "Iter",
    "Len",
    "Mul",
    "Write",
    "center",
    "chunks",
    "count",
    "decode",
    "ends_with",
    "escape_ascii",
    "find",
    "from_hex",
    "hex",
    "index",
    "is_ascii",
    "join",
    "split",
    "starts_with",
    "to_vec",
    "trim_ascii",
];

const TYPE: &[&str] = &["name", "qualified_name", "size_hint"];

const NAMESPACE: &[&str] = &[
    "Contains", "GetItem", "Iter", "Len", "SetItem", "get", "keys", "values",
];

const INT: &[&str] = &["Add", "Mul", "Neg", "Sub", "abs", "signum"];
const BOOL: &[&str] = &["And", "Not", "Or"];
const LIST: &[&str] = &[
    "Add", "Contains", "GetItem", "Iter", "Len", "Mul", "SetItem", "append", "count", "index",
    "reverse",
];
const TUPLE: &[&str] = &["Add", "Contains", "GetItem", "Iter", "Len", "Mul", "count", "index"];
const SLICE: &[&str] = &["start", "step", "stop"];
const FUNCTION: &[&str] = &["Call", "name"];
const COMBINATOR: &[&str] = &["Call", "absorb", "commit"];

/// Capabilities a kind declares on top of the universal vocabulary.
pub fn declared_capabilities(kind: TypeKind) -> &'static [&'static str] {
    match kind {
        TypeKind::None => &[],
        TypeKind::Bool => BOOL,
        TypeKind::Int => INT,
        TypeKind::Str => STR,
        TypeKind::Bytes => BYTES,
        TypeKind::List => LIST,
        TypeKind::Tuple => TUPLE,
        TypeKind::Slice => SLICE,
        TypeKind::Type => TYPE,
        TypeKind::Function => FUNCTION,
        TypeKind::Combinator => COMBINATOR,
        TypeKind::Namespace => NAMESPACE,
        TypeKind::Carrier => CARRIER,
    }
}

pub fn declares(kind: TypeKind, identifier: &str) -> bool {
    declared_capabilities(kind).iter().any(|c| *c == identifier)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityTable {
    kind: TypeKind,
    entries: Vec<&'static str>,
}

impl CapabilityTable {
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[&'static str] {
        &self.entries
    }

    /// The identifier `offset` places after the start of the table.
    pub fn at(&self, offset: usize) -> Result<&'static str> {
        let mut it = self.entries.iter().copied();
        if offset > 0 {
            it.nth(offset - 1);
        }
        it.next().ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::Capability,
                format!(
                    "offset {offset} out of range for {} (len {})",
                    self.kind.as_str(),
                    self.entries.len()
                ),
            )
        })
    }

    pub fn position(&self, identifier: &str) -> Option<usize> {
        self.entries.iter().position(|e| *e == identifier)
    }
}

/// Probe one type kind under a host profile.
pub fn probe(profile: ProfileId, kind: TypeKind) -> CapabilityTable {
    let mut entries = profile.universal_capabilities();
    entries.extend_from_slice(declared_capabilities(kind));
    entries.sort_unstable();
    entries.dedup();
    CapabilityTable { kind, entries }
}

/// A host profile with every kind probed once.
#[derive(Debug, Clone)]
pub struct HostProfile {
    id: ProfileId,
    tables: BTreeMap<TypeKind, CapabilityTable>,
}

impl HostProfile {
    pub fn new(id: ProfileId) -> Self {
        let tables = TypeKind::all()
            .iter()
            .map(|&k| (k, probe(id, k)))
            .collect();
        HostProfile { id, tables }
    }

    pub fn id(&self) -> ProfileId {
        self.id
    }

    pub fn table(&self, kind: TypeKind) -> &CapabilityTable {
        // Every kind is probed in `new`.
        &self.tables[&kind]
    }

    /// True if `identifier` is part of the kind's capability table.
    pub fn exposes(&self, kind: TypeKind, identifier: &str) -> bool {
        self.table(kind).position(identifier).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_sorted_and_unique() {
        for &p in ProfileId::all() {
            for &k in TypeKind::all() {
                let t = probe(p, k);
                let mut sorted = t.entries().to_vec();
                sorted.sort_unstable();
                sorted.dedup();
                assert_eq!(sorted, t.entries(), "{p:?} {k:?}");
                assert_eq!(
                    t.len(),
                    p.universal_len() + declared_capabilities(k).len(),
                    "declared capability collides with universal one in {k:?}"
                );
            }
        }
    }

    #[test]
    fn carrier_offsets_are_pinned() {
        for &p in ProfileId::all() {
            let t = probe(p, TypeKind::Carrier);
            assert_eq!(t.at(0).unwrap(), CAP_APPEND);
            assert_eq!(t.at(10).unwrap(), CAP_INDEX_READ);
            assert_eq!(t.at(24).unwrap(), CAP_INDEX_WRITE);
        }
    }

    #[test]
    fn out_of_range_offset_is_an_error() {
        let t = probe(ProfileId::V1, TypeKind::Carrier);
        assert_eq!(t.len(), 30);
        assert!(t.at(29).is_ok());
        let err = t.at(30).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Capability);
        assert!(err.message.contains("out of range"));
    }

    #[test]
    fn host_profile_caches_every_kind() {
        let host = HostProfile::new(ProfileId::V2);
        for &k in TypeKind::all() {
            assert_eq!(host.table(k), &probe(ProfileId::V2, k));
        }
        assert!(host.exposes(TypeKind::Str, "join"));
        assert!(!host.exposes(TypeKind::Carrier, "join"));
    }
}
