//! Shared host profile registry.
//!
//! This crate exists so both:
//! - the runtime (capability probing, offset defaults)
//! - tooling (the `sigil` CLI, offset audits)
//!
//! can share an authoritative list of host profiles and the universal capability
//! vocabulary each of them exposes on every type.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ProfileId {
    V1,
    #[default]
    V2,
}

/// Universal capabilities every type exposes under the `v1` profile.
///
/// Protocol capabilities are PascalCase so they always sort ahead of the
/// snake_case named operations a type declares.
const UNIVERSAL_V1: &[&str] = &[
    "Any",
    "AsRef",
    "Borrow",
    "Class",
    "Clone",
    "Debug",
    "Default",
    "Display",
    "Eq",
    "Hash",
    "Identity",
    "Init",
    "InitSubclass",
    "Layout",
    "Module",
    "Ne",
    "New",
    "Ord",
    "PartialEq",
    "PartialOrd",
    "Repr",
    "SetAttr",
    "SizeOf",
    "SubclassHook",
    "ToOwned",
    "ToString",
    "TypeId",
];

// v2 appends one protocol capability. It sorts after every carrier capability, so
// only offsets into named operations move.
const UNIVERSAL_V2_EXTRA: &[&str] = &["WeakRef"];

impl ProfileId {
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileId::V1 => "v1",
            ProfileId::V2 => "v2",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "v1" => Some(ProfileId::V1),
            "v2" => Some(ProfileId::V2),
            _ => None,
        }
    }

    pub fn all() -> &'static [ProfileId] {
        &[ProfileId::V1, ProfileId::V2]
    }

    /// The universal capability prefix, in declaration order (not sorted).
    pub fn universal_capabilities(self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = UNIVERSAL_V1.to_vec();
        if self == ProfileId::V2 {
            out.extend_from_slice(UNIVERSAL_V2_EXTRA);
        }
        out
    }

    /// Number of universal capabilities; every named-operation offset depends on it.
    pub fn universal_len(self) -> usize {
        match self {
            ProfileId::V1 => UNIVERSAL_V1.len(),
            ProfileId::V2 => UNIVERSAL_V1.len() + UNIVERSAL_V2_EXTRA.len(),
        }
    }
}
