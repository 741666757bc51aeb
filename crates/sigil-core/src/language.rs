pub const LANG_ID: &str = "sigil-core@0.1.0";

pub mod limits {
    pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024;
    pub const MAX_EXPR_NODES: usize = 50_000;
    pub const MAX_EXPR_DEPTH: usize = 256;
    pub const MAX_SEQUENCE_LEN: usize = 16 * 1024 * 1024;

    fn env_usize(var: &str, default: usize) -> usize {
        match std::env::var(var) {
            Ok(v) => v
                .parse::<usize>()
                .ok()
                .filter(|v| *v > 0)
                .unwrap_or(default),
            Err(_) => default,
        }
    }

    /// Upper bound on the hex text of one bootstrap payload.
    pub fn max_payload_bytes() -> usize {
        env_usize("SIGIL_MAX_PAYLOAD_BYTES", MAX_PAYLOAD_BYTES)
    }

    pub fn max_expr_nodes() -> usize {
        env_usize("SIGIL_MAX_EXPR_NODES", MAX_EXPR_NODES)
    }

    pub fn max_expr_depth() -> usize {
        env_usize("SIGIL_MAX_EXPR_DEPTH", MAX_EXPR_DEPTH)
    }

    /// Upper bound on the elements (bytes for strings) a repetition may produce.
    pub fn max_sequence_len() -> usize {
        env_usize("SIGIL_MAX_SEQUENCE_LEN", MAX_SEQUENCE_LEN)
    }
}
