//! Shared, version-pinned protocol identifiers.
//!
//! These constants are the single source of truth for schema/version strings that
//! appear in machine-readable I/O (CLI reports, offset tables, diagnostics).

pub const SIGIL_DIAG_SCHEMA_VERSION: &str = "sigil.diag@0.1.0";
pub const SIGIL_REPORT_SCHEMA_VERSION: &str = "sigil.report@0.1.0";

pub const CAPABILITY_TABLE_SCHEMA_VERSION: &str = "sigil.capabilities@0.1.0";
pub const OFFSET_TABLE_SCHEMA_VERSION: &str = "sigil.offsets@0.1.0";
pub const OFFSET_AUDIT_SCHEMA_VERSION: &str = "sigil.offsets.audit@0.1.0";
pub const BINDINGS_REPORT_SCHEMA_VERSION: &str = "sigil.bindings@0.1.0";
