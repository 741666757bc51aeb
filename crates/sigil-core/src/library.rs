//! The combinator library.
//!
//! `Compose`, `Args`, `Negate` and `ListOf` come from the bootstrap payloads and
//! are read back from the environment by name. `Call`, `GetName` and `Reverse`
//! are assembled here and published the same way.

use crate::bootstrap;
use crate::combinator::Combinator;
use crate::error::{ErrorKind, Result, RuntimeError};
use crate::reflect;
use crate::runtime::Runtime;
use crate::value::{Func, TypeKind, Value};

pub const COMPOSE: &str = "Compose";
pub const ARGS: &str = "Args";
pub const CALL: &str = "Call";
pub const GET_NAME: &str = "GetName";
pub const NEGATE: &str = "Negate";
pub const REVERSE: &str = "Reverse";
pub const LIST_OF: &str = "ListOf";

pub const NAMES: &[&str] = &[COMPOSE, ARGS, CALL, GET_NAME, NEGATE, REVERSE, LIST_OF];

#[derive(Debug, Clone)]
pub struct Library {
    compose: Combinator,
    args: Combinator,
    call: Combinator,
    get_name: Combinator,
    negate: Combinator,
    reverse: Combinator,
    list_of: Combinator,
}

fn read_combinator(rt: &Runtime, name: &str) -> Result<Combinator> {
    match rt.get_value(name)? {
        Value::Combinator(node) => Ok(*node),
        other => Err(RuntimeError::new(
            ErrorKind::Internal,
            format!(
                "binding {name:?} should hold a combinator, found {}",
                other.kind().as_str()
            ),
        )),
    }
}

fn publish(rt: &Runtime, name: &str, node: &Combinator) -> Result<()> {
    rt.set_value(name, Value::Combinator(Box::new(node.clone())))?;
    Ok(())
}

impl Library {
    /// Install the bootstrap payloads, then assemble and publish the rest.
    pub fn load(rt: &Runtime) -> Result<Self> {
        bootstrap::install(rt)?;
        let compose = read_combinator(rt, COMPOSE)?;
        let args = read_combinator(rt, ARGS)?;
        let negate = read_combinator(rt, NEGATE)?;
        let list_of = read_combinator(rt, LIST_OF)?;

        let call = Combinator::Call(Vec::new());

        let get_name = Combinator::GetName {
            capability: rt.capability(TypeKind::Type, rt.offsets().type_name)?,
            operands: Vec::new(),
        };

        // slice(none, none, negate(1)), built from the other combinators.
        let step = negate.absorb(Value::Int(1))?.commit()?;
        let capture = args
            .absorb_all([Value::None, Value::None, step])?
            .commit()?;
        let slice = Value::Func(Func::new("slice", reflect::make_slice));
        let selector = call.absorb_all([capture, slice])?.commit()?;
        let reverse = Combinator::Reverse {
            selector,
            index_capability: rt.capability(TypeKind::Carrier, rt.offsets().read)?,
            operands: Vec::new(),
        };

        publish(rt, CALL, &call)?;
        publish(rt, GET_NAME, &get_name)?;
        publish(rt, REVERSE, &reverse)?;

        Ok(Library {
            compose,
            args,
            call,
            get_name,
            negate,
            reverse,
            list_of,
        })
    }

    pub fn node(&self, name: &str) -> Option<&Combinator> {
        match name {
            COMPOSE => Some(&self.compose),
            ARGS => Some(&self.args),
            CALL => Some(&self.call),
            GET_NAME => Some(&self.get_name),
            NEGATE => Some(&self.negate),
            REVERSE => Some(&self.reverse),
            LIST_OF => Some(&self.list_of),
            _ => None,
        }
    }

    /// `compose([f, g, h])(x) == f(g(h(x)))`
    pub fn compose(&self, fns: impl IntoIterator<Item = Value>) -> Result<Value> {
        self.compose.absorb_all(fns)?.commit()
    }

    /// `args([a, b])(f) == f(a, b)`
    pub fn args(&self, captured: impl IntoIterator<Item = Value>) -> Result<Value> {
        self.args.absorb_all(captured)?.commit()
    }

    pub fn call(&self, f: Value, args: impl IntoIterator<Item = Value>) -> Result<Value> {
        self.call.absorb(f)?.absorb_all(args)?.commit()
    }

    pub fn get_name(&self, v: Value) -> Result<Value> {
        self.get_name.absorb(v)?.commit()
    }

    pub fn negate(&self, n: i64) -> Result<Value> {
        self.negate.absorb(Value::Int(n))?.commit()
    }

    pub fn reverse(&self, seq: Value) -> Result<Value> {
        self.reverse.absorb(seq)?.commit()
    }

    pub fn list_of(&self, items: impl IntoIterator<Item = Value>) -> Result<Value> {
        self.list_of.absorb_all(items)?.commit()
    }
}
