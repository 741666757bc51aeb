//! Offset tables: which position in which capability table means what.
//!
//! The numbers here are host-specific configuration. Each profile ships defaults,
//! and a JSON file can override them; `OffsetTable::audit` reports every offset
//! that no longer lands on the capability it is meant to name.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sigil_contracts::OFFSET_TABLE_SCHEMA_VERSION;
use sigil_hosts::ProfileId;

use crate::capability::{HostProfile, CAP_APPEND, CAP_INDEX_READ, CAP_INDEX_WRITE};
use crate::value::TypeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetTable {
    pub append: usize,
    pub read: usize,
    pub write: usize,
    pub str_casefold: usize,
    pub str_join: usize,
    pub bytes_decode: usize,
    pub bytes_from_hex: usize,
    pub type_name: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OffsetTableFile {
    schema_version: String,
    #[serde(default)]
    profile: Option<String>,
    offsets: OffsetTable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OffsetMismatch {
    pub slot: &'static str,
    pub kind: &'static str,
    pub offset: usize,
    pub expected: &'static str,
    pub found: Option<&'static str>,
}

impl OffsetTable {
    pub fn for_profile(profile: ProfileId) -> Self {
        // Named operations sit after the universal prefix, so they move with it.
        let shift = profile.universal_len() - ProfileId::V1.universal_len();
        OffsetTable {
            append: 0,
            read: 10,
            write: 24,
            str_casefold: 34 + shift,
            str_join: 56 + shift,
            bytes_decode: 38 + shift,
            bytes_from_hex: 42 + shift,
            type_name: 27 + shift,
        }
    }

    fn slots(&self) -> [(&'static str, TypeKind, usize, &'static str); 8] {
        [
            ("append", TypeKind::Carrier, self.append, CAP_APPEND),
            ("read", TypeKind::Carrier, self.read, CAP_INDEX_READ),
            ("write", TypeKind::Carrier, self.write, CAP_INDEX_WRITE),
            ("str_casefold", TypeKind::Str, self.str_casefold, "casefold"),
            ("str_join", TypeKind::Str, self.str_join, "join"),
            ("bytes_decode", TypeKind::Bytes, self.bytes_decode, "decode"),
            ("bytes_from_hex", TypeKind::Bytes, self.bytes_from_hex, "from_hex"),
            ("type_name", TypeKind::Type, self.type_name, "name"),
        ]
    }

    /// Every slot whose offset does not land on its intended capability.
    pub fn audit(&self, host: &HostProfile) -> Vec<OffsetMismatch> {
        self.slots()
            .into_iter()
            .filter_map(|(slot, kind, offset, expected)| {
                let found = host.table(kind).at(offset).ok();
                if found == Some(expected) {
                    return None;
                }
                Some(OffsetMismatch {
                    slot,
                    kind: kind.as_str(),
                    offset,
                    expected,
                    found,
                })
            })
            .collect()
    }

    pub fn from_json(bytes: &[u8]) -> Result<(Option<ProfileId>, Self)> {
        let file: OffsetTableFile =
            serde_json::from_slice(bytes).context("parse offset table JSON")?;
        if file.schema_version.trim() != OFFSET_TABLE_SCHEMA_VERSION {
            anyhow::bail!(
                "offset table schema_version mismatch: expected {OFFSET_TABLE_SCHEMA_VERSION} got {:?}",
                file.schema_version
            );
        }
        let profile = match file.profile.as_deref() {
            None => None,
            Some(p) => Some(
                ProfileId::parse(p).with_context(|| format!("unknown profile {p:?}"))?,
            ),
        };
        Ok((profile, file.offsets))
    }

    pub fn load(path: &Path) -> Result<(Option<ProfileId>, Self)> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read offset table: {}", path.display()))?;
        Self::from_json(&bytes).with_context(|| format!("load offset table: {}", path.display()))
    }

    pub fn to_json(&self, profile: ProfileId) -> serde_json::Value {
        serde_json::json!({
            "schema_version": OFFSET_TABLE_SCHEMA_VERSION,
            "profile": profile.as_str(),
            "offsets": self,
        })
    }
}
