//! String and byte helpers, each resolved through a capability offset.

use crate::error::{Result, RuntimeError};
use crate::reflect::get_attr;
use crate::runtime::Runtime;
use crate::value::{SliceSpec, TypeKind, Value};

#[derive(Debug, Clone)]
pub struct TextOps {
    concat: Value,
    casefold: Value,
    join: Value,
    read: &'static str,
    from_hex: Value,
    decode: Value,
}

impl TextOps {
    pub fn new(rt: &Runtime) -> Result<Self> {
        let offsets = *rt.offsets();
        let str_type = Value::Type(TypeKind::Str);
        let bytes_type = Value::Type(TypeKind::Bytes);
        let read = rt.capability(TypeKind::Carrier, offsets.read)?;

        let concat = get_attr(&str_type, rt.capability(TypeKind::Str, offsets.append)?)?;
        let casefold = get_attr(&str_type, rt.capability(TypeKind::Str, offsets.str_casefold)?)?;
        let from_hex = get_attr(
            &bytes_type,
            rt.capability(TypeKind::Bytes, offsets.bytes_from_hex)?,
        )?;
        let decode = get_attr(
            &bytes_type,
            rt.capability(TypeKind::Bytes, offsets.bytes_decode)?,
        )?;

        // The empty string is the type's own name with everything sliced away.
        let type_name = get_attr(&str_type, rt.capability(TypeKind::Type, offsets.type_name)?)?;
        let empty = clear_with(read, &type_name)?;
        let join = get_attr(&empty, rt.capability(TypeKind::Str, offsets.str_join)?)?;

        Ok(TextOps {
            concat,
            casefold,
            join,
            read,
            from_hex,
            decode,
        })
    }

    pub fn concat(&self, a: &str, b: &str) -> Result<String> {
        let out = self.concat.call(vec![Value::str(a), Value::str(b)])?;
        Ok(out.expect_str("concat")?.to_string())
    }

    pub fn casefold(&self, s: &str) -> Result<String> {
        let out = self.casefold.call(vec![Value::str(s)])?;
        Ok(out.expect_str("casefold")?.to_string())
    }

    /// Concatenate string parts with no separator.
    pub fn join(&self, parts: Vec<Value>) -> Result<String> {
        let out = self.join.call(vec![Value::List(parts)])?;
        Ok(out.expect_str("join")?.to_string())
    }

    /// An empty sequence of the same kind as `seq`.
    pub fn clear(&self, seq: &Value) -> Result<Value> {
        clear_with(self.read, seq)
    }

    pub fn empty_string(&self) -> Result<Value> {
        self.clear(&Value::str("sigil"))
    }

    pub fn from_hex(&self, hex: &str) -> Result<Vec<u8>> {
        match self.from_hex.call(vec![Value::str(hex)])? {
            Value::Bytes(b) => Ok(b),
            other => Err(RuntimeError::type_mismatch(
                "from_hex",
                "bytes",
                other.kind().as_str(),
            )),
        }
    }

    pub fn decode(&self, bytes: Vec<u8>) -> Result<String> {
        let out = self.decode.call(vec![Value::Bytes(bytes)])?;
        Ok(out.expect_str("decode")?.to_string())
    }

    /// Hex text to UTF-8 text.
    pub fn decode_hex(&self, hex: &str) -> Result<String> {
        self.decode(self.from_hex(hex)?)
    }
}

fn clear_with(read: &str, seq: &Value) -> Result<Value> {
    let everything_before_zero = Value::Slice(SliceSpec {
        start: None,
        stop: Some(0),
        step: None,
    });
    get_attr(seq, read)?.call(vec![everything_before_zero])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use sigil_hosts::ProfileId;

    use crate::runtime::RuntimeOptions;

    fn ops(profile: ProfileId) -> TextOps {
        let rt = Runtime::new(RuntimeOptions {
            profile,
            offsets: None,
        });
        TextOps::new(&rt).unwrap()
    }

    #[test]
    fn helpers_behave_under_every_profile() {
        for &p in ProfileId::all() {
            let t = ops(p);
            assert_eq!(t.concat("ab", "cd").unwrap(), "abcd");
            assert_eq!(t.casefold("HeLLo").unwrap(), "hello");
            assert_eq!(
                t.join(vec![Value::str("a"), Value::str("b")]).unwrap(),
                "ab"
            );
            assert_eq!(t.empty_string().unwrap(), Value::str(""));
            assert_eq!(t.decode_hex("48656c6c6f").unwrap(), "Hello");
        }
    }

    #[test]
    fn clear_keeps_the_sequence_kind() {
        let t = ops(ProfileId::V2);
        assert_eq!(
            t.clear(&Value::List(vec![Value::Int(1)])).unwrap(),
            Value::List(vec![])
        );
        assert_eq!(t.clear(&Value::Bytes(vec![1, 2])).unwrap(), Value::Bytes(vec![]));
    }

    #[test]
    fn bad_payloads() {
        let t = ops(ProfileId::V2);
        assert_eq!(t.from_hex("abc").unwrap_err().kind, ErrorKind::Payload);
        assert_eq!(t.decode(vec![0xc3]).unwrap_err().kind, ErrorKind::Payload);
    }

    #[test]
    fn cross_profile_offsets_resolve_a_neighbor() {
        let rt = Runtime::new(RuntimeOptions {
            profile: ProfileId::V1,
            offsets: Some(crate::offsets::OffsetTable::for_profile(ProfileId::V2)),
        });
        // v2's join offset lands on `lines` under v1: no error, wrong behavior.
        let t = TextOps::new(&rt).unwrap();
        assert!(t.join(vec![Value::str("a")]).is_err());
    }
}
