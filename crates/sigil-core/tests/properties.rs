use sigil_core::accumulator::{build_list, build_map, build_string, feed};
use sigil_core::bootstrap::{decode_and_evaluate, encode_program};
use sigil_core::capability::probe;
use sigil_core::error::ErrorKind;
use sigil_core::library::Library;
use sigil_core::offsets::OffsetTable;
use sigil_core::pipeline::Pipeline;
use sigil_core::runtime::{Runtime, RuntimeOptions};
use sigil_core::textops::TextOps;
use sigil_core::value::{Func, TypeKind, Value};
use sigil_hosts::ProfileId;

fn runtime(profile: ProfileId) -> Runtime {
    Runtime::new(RuntimeOptions {
        profile,
        offsets: None,
    })
}

fn code_points(s: &str) -> Vec<Value> {
    s.chars().map(|c| Value::Int(c as i64)).collect()
}

#[test]
fn carrier_read_and_write_offsets_are_pinned() {
    for &p in ProfileId::all() {
        let rt = runtime(p);
        let table = probe(p, TypeKind::Carrier);
        assert_eq!(table.at(rt.offsets().read).unwrap(), "GetItem");
        assert_eq!(table.at(rt.offsets().write).unwrap(), "SetItem");
        assert!(rt.offsets().audit(rt.host()).is_empty());
    }
}

#[test]
fn write_then_read_is_identity() {
    let rt = runtime(ProfileId::V1);
    let values = [
        Value::None,
        Value::Int(-7),
        Value::Bytes(vec![0, 255]),
        Value::Tuple(vec![Value::str("t")]),
        Value::Type(TypeKind::Slice),
    ];
    for (i, v) in values.into_iter().enumerate() {
        let name = format!("v{i}");
        rt.set_value_fn(&name).unwrap().call1(v.clone()).unwrap();
        assert_eq!(rt.get_value(&name).unwrap(), v);
    }
}

#[test]
fn build_map_cases() {
    let rt = runtime(ProfileId::V2);
    let chr = Value::Func(Func::new("chr", sigil_core::reflect::chr));
    let string = build_map(&rt, TypeKind::Str)
        .and_then(|f| f.call(vec![chr]))
        .and_then(|f| f.call(vec![Value::str("")]))
        .and_then(|f| f.call(vec![Value::str("")]))
        .unwrap();
    assert_eq!(
        feed(&string, [Value::Int(65), Value::Int(66)]).unwrap(),
        Value::str("AB")
    );
    assert_eq!(feed(&string, []).unwrap(), Value::str(""));

    let list = build_list(&rt).unwrap();
    assert_eq!(
        feed(&list, [Value::Int(1), Value::Int(2), Value::Int(3)]).unwrap(),
        Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
}

#[test]
fn compose_runs_bottom_up() {
    let rt = runtime(ProfileId::V2);
    let lib = Library::load(&rt).unwrap();
    let append = |suffix: &'static str| {
        Value::Func(Func::new(suffix, move |args| {
            Ok(Value::str(format!("{}{suffix}", args[0].expect_str("stage")?)))
        }))
    };
    let f = lib.compose([append("f"), append("g"), append("h")]).unwrap();
    assert_eq!(f.call(vec![Value::str("x")]).unwrap(), Value::str("xhgf"));

    let p = Pipeline::new()
        .stage(append("f"))
        .stage(append("g"))
        .stage(append("h"));
    assert_eq!(p.run(&lib, Value::str("x")).unwrap(), Value::str("xhgf"));
}

#[test]
fn hex_round_trip() {
    let rt = runtime(ProfileId::V1);
    let ops = TextOps::new(&rt).unwrap();
    for text in ["", "plain", "ünïcödé ✓", r#"["set","k",1]"#] {
        let hex = encode_program(text);
        assert_eq!(hex, hex::encode(text));
        assert_eq!(ops.decode_hex(&hex).unwrap(), text);
    }
}

#[test]
fn reverse_is_an_involution() {
    let rt = runtime(ProfileId::V1);
    let lib = Library::load(&rt).unwrap();
    for seq in [
        Value::str("racecar!"),
        Value::str("a"),
        Value::Tuple(vec![Value::Int(1), Value::None]),
        Value::List(vec![]),
    ] {
        let twice = lib.reverse(lib.reverse(seq.clone()).unwrap()).unwrap();
        assert_eq!(twice, seq);
    }
}

#[test]
fn hello_world_from_reversed_code_points() {
    let rt = runtime(ProfileId::V2);
    let lib = Library::load(&rt).unwrap();
    let backwards = feed(&build_string(&rt).unwrap(), code_points("!dlroW olleH")).unwrap();
    assert_eq!(lib.reverse(backwards).unwrap(), Value::str("Hello World!"));
}

#[test]
fn hello_world_folded_left_to_right() {
    let rt = runtime(ProfileId::V1);
    let ops = TextOps::new(&rt).unwrap();
    let chr = Value::Func(Func::new("chr", sigil_core::reflect::chr));
    let string = build_map(&rt, TypeKind::Str)
        .and_then(|f| f.call(vec![chr]))
        .and_then(|f| f.call(vec![Value::str("")]))
        .and_then(|f| f.call(vec![Value::str("")]))
        .unwrap();

    let hello = feed(&string, [72, 101, 108, 108, 111].map(Value::Int)).unwrap();
    let world = feed(&string, [87, 111, 114, 108, 100].map(Value::Int)).unwrap();
    assert_eq!(hello, Value::str("Hello"));
    assert_eq!(world, Value::str("World"));

    let joined = ops
        .join(vec![hello.clone(), Value::str(" "), world.clone(), Value::str("!")])
        .unwrap();
    assert_eq!(joined, "Hello World!");

    let mut folded = ops.empty_string().unwrap().as_str().unwrap().to_string();
    for piece in [hello, Value::str(" "), world, Value::str("!")] {
        folded = ops.concat(&folded, piece.as_str().unwrap()).unwrap();
    }
    assert_eq!(folded, joined);
}

#[test]
fn greeting_assembled_and_evaluated_through_bindings() {
    // Program text assembled from code points, then evaluated.
    let rt = runtime(ProfileId::V2);
    Library::load(&rt).unwrap();
    let program = r#"["set","greeting",["commit",["absorb","Reverse",["quote","!iH"]]]]"#;
    let text = feed(&build_string(&rt).unwrap(), code_points(program)).unwrap();
    let out = rt.eval_text(text.as_str().unwrap()).unwrap();
    assert_eq!(out, Value::str("Hi!"));
    assert_eq!(rt.get_value("greeting").unwrap(), Value::str("Hi!"));
}

#[test]
fn keyword_table_via_join_and_casefold() {
    let rt = runtime(ProfileId::V1);
    let ops = TextOps::new(&rt).unwrap();
    let lib = Library::load(&rt).unwrap();
    let names: Vec<Value> = [TypeKind::Str, TypeKind::Bytes, TypeKind::List]
        .into_iter()
        .map(|k| lib.get_name(Value::Type(k)).unwrap())
        .collect();
    assert_eq!(ops.join(names).unwrap(), "strbyteslist");
    assert_eq!(ops.casefold("KEYWORD").unwrap(), "keyword");
}

#[test]
fn payload_is_evaluated_once() {
    let rt = runtime(ProfileId::V2);
    let payload = encode_program(r#"["set","counter",["list","counter",1]]"#);
    rt.set_value("counter", Value::List(vec![])).unwrap();
    decode_and_evaluate(&rt, &payload).unwrap();
    let cached = decode_and_evaluate(&rt, &payload).unwrap();
    assert_eq!(cached.names, vec!["counter"]);
    assert_eq!(
        rt.get_value("counter").unwrap(),
        Value::List(vec![Value::List(vec![]), Value::Int(1)])
    );
}

#[test]
fn wrong_offsets_fail_loudly_only_when_out_of_range() {
    let mut offsets = OffsetTable::for_profile(ProfileId::V1);
    offsets.write = 1_000;
    let rt = Runtime::new(RuntimeOptions {
        profile: ProfileId::V1,
        offsets: Some(offsets),
    });
    let err = rt.set_value("x", Value::Int(1)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Capability);

    // In range but wrong: reads resolve `Eq` and quietly answer a comparison.
    offsets.read = 9;
    let rt = Runtime::new(RuntimeOptions {
        profile: ProfileId::V1,
        offsets: Some(offsets),
    });
    assert_eq!(probe(ProfileId::V1, TypeKind::Carrier).at(9).unwrap(), "Eq");
    assert_eq!(rt.get_value("anything").unwrap(), Value::Bool(false));
    assert_eq!(rt.offsets().audit(rt.host()).len(), 2);
}
