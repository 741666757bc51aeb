//! Bootstrap payloads.
//!
//! Each payload is the hex encoding of program text that binds one combinator.
//! Decoding goes through the capability-resolved `from_hex` and `decode`
//! helpers, and each distinct payload is evaluated at most once per runtime.

use serde::Serialize;

use crate::error::{ErrorKind, Result, RuntimeError};
use crate::language::limits;
use crate::runtime::Runtime;
use crate::textops::TextOps;
use crate::util::sha256_hex;

/// `["set","Compose",["prim","compose"]]`
pub const COMPOSE_PAYLOAD: &str =
    "5b22736574222c22436f6d706f7365222c5b227072696d222c22636f6d706f7365225d5d";
/// `["set","Args",["prim","args"]]`
pub const ARGS_PAYLOAD: &str = "5b22736574222c2241726773222c5b227072696d222c2261726773225d5d";
/// `["set","Negate",["prim","negate"]]`
pub const NEGATE_PAYLOAD: &str =
    "5b22736574222c224e6567617465222c5b227072696d222c226e6567617465225d5d";
/// `["set","ListOf",["prim","list_of"]]`
pub const LIST_OF_PAYLOAD: &str =
    "5b22736574222c224c6973744f66222c5b227072696d222c226c6973745f6f66225d5d";

pub const PAYLOADS: &[&str] = &[COMPOSE_PAYLOAD, ARGS_PAYLOAD, NEGATE_PAYLOAD, LIST_OF_PAYLOAD];

/// Names a payload bound or rebound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bindings {
    pub names: Vec<String>,
}

/// Program text to payload hex.
pub fn encode_program(text: &str) -> String {
    hex::encode(text.as_bytes())
}

/// Decode one payload and evaluate it in the runtime's top-level scope.
pub fn decode_and_evaluate(rt: &Runtime, payload: &str) -> Result<Bindings> {
    let payload = payload.trim();
    let max = limits::max_payload_bytes();
    if payload.len() > max {
        return Err(RuntimeError::new(
            ErrorKind::Budget,
            format!("payload is {} bytes (max {max})", payload.len()),
        ));
    }

    let digest = sha256_hex(payload.to_ascii_lowercase().as_bytes());
    if let Some(bindings) = rt.cached_payload(&digest) {
        return Ok(bindings);
    }

    let text = TextOps::new(rt)?.decode_hex(payload)?;
    let before = rt.environment().snapshot();
    rt.eval_text(&text)?;
    let after = rt.environment().snapshot();

    let names = after
        .into_iter()
        .filter(|(name, value)| before.get(name) != Some(value))
        .map(|(name, _)| name)
        .collect();
    let bindings = Bindings { names };
    rt.remember_payload(digest, bindings.clone());
    Ok(bindings)
}

/// Evaluate every bootstrap payload; the first failure aborts.
pub fn install(rt: &Runtime) -> Result<Bindings> {
    let mut all = Bindings::default();
    for payload in PAYLOADS {
        let bound = decode_and_evaluate(rt, payload)?;
        all.names.extend(bound.names);
    }
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn payloads_decode_to_the_documented_text() {
        let rt = Runtime::default();
        let ops = TextOps::new(&rt).unwrap();
        assert_eq!(
            ops.decode_hex(COMPOSE_PAYLOAD).unwrap(),
            r#"["set","Compose",["prim","compose"]]"#
        );
        for p in PAYLOADS {
            let text = ops.decode_hex(p).unwrap();
            assert_eq!(encode_program(&text), *p);
        }
    }

    #[test]
    fn install_binds_each_combinator_once() {
        let rt = Runtime::default();
        let bound = install(&rt).unwrap();
        assert_eq!(bound.names, vec!["Compose", "Args", "Negate", "ListOf"]);
        assert_eq!(rt.loaded_payloads(), PAYLOADS.len());

        // A second install hits the cache and re-evaluates nothing.
        rt.set_value("Compose", Value::Int(0)).unwrap();
        install(&rt).unwrap();
        assert_eq!(rt.get_value("Compose").unwrap(), Value::Int(0));
    }

    #[test]
    fn bindings_report_rebinds() {
        let rt = Runtime::default();
        rt.set_value("x", Value::Int(1)).unwrap();
        let payload = encode_program(r#"["begin",["set","x",1],["set","y",2]]"#);
        let bound = decode_and_evaluate(&rt, &payload).unwrap();
        // `x` kept its value, so only `y` is reported.
        assert_eq!(bound.names, vec!["y"]);
    }

    #[test]
    fn malformed_payloads() {
        let rt = Runtime::default();
        let odd = decode_and_evaluate(&rt, "5b2").unwrap_err();
        assert_eq!(odd.kind, ErrorKind::Payload);
        let not_utf8 = decode_and_evaluate(&rt, "ff").unwrap_err();
        assert_eq!(not_utf8.kind, ErrorKind::Payload);
        let not_program = decode_and_evaluate(&rt, &encode_program("hello")).unwrap_err();
        assert_eq!(not_program.kind, ErrorKind::Eval);
        assert_eq!(rt.loaded_payloads(), 0);
    }
}
