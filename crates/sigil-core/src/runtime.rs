use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use sigil_hosts::ProfileId;

use crate::bootstrap::Bindings;
use crate::capability::HostProfile;
use crate::env::Environment;
use crate::error::{ErrorKind, Result, RuntimeError};
use crate::eval;
use crate::offsets::OffsetTable;
use crate::reflect::{self, get_attr};
use crate::value::{Func, TypeKind, Value};

#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    pub profile: ProfileId,
    /// Overrides the profile's own offsets when set.
    pub offsets: Option<OffsetTable>,
}

impl RuntimeOptions {
    pub fn offsets(&self) -> OffsetTable {
        self.offsets.unwrap_or_else(|| OffsetTable::for_profile(self.profile))
    }
}

/// Handle to one runtime: a host profile, its offsets and one environment table.
///
/// Clones share the environment and the payload cache.
#[derive(Debug, Clone)]
pub struct Runtime {
    host: Rc<HostProfile>,
    offsets: OffsetTable,
    env: Environment,
    payloads: Rc<RefCell<BTreeMap<String, Bindings>>>,
    eval_depth: Rc<Cell<usize>>,
}

/// One level of evaluation nesting, released on drop.
pub(crate) struct EvalFrame {
    depth: Rc<Cell<usize>>,
}

impl Drop for EvalFrame {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new(RuntimeOptions::default())
    }
}

impl Runtime {
    pub fn new(options: RuntimeOptions) -> Self {
        Runtime {
            host: Rc::new(HostProfile::new(options.profile)),
            offsets: options.offsets(),
            env: Environment::new(),
            payloads: Rc::new(RefCell::new(BTreeMap::new())),
            eval_depth: Rc::new(Cell::new(0)),
        }
    }

    pub fn host(&self) -> &HostProfile {
        &self.host
    }

    pub fn offsets(&self) -> &OffsetTable {
        &self.offsets
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// The environment as a value, reachable only through its capabilities.
    pub fn namespace(&self) -> Value {
        Value::Namespace(self.env.clone())
    }

    /// Identifier at `offset` in the capability table of `kind`.
    pub fn capability(&self, kind: TypeKind, offset: usize) -> Result<&'static str> {
        self.host.table(kind).at(offset)
    }

    pub fn get_value(&self, name: &str) -> Result<Value> {
        let read = self.capability(TypeKind::Carrier, self.offsets.read)?;
        get_attr(&self.namespace(), read)?.call(vec![Value::str(name)])
    }

    pub fn set_value(&self, name: &str, value: Value) -> Result<Value> {
        let write = self.capability(TypeKind::Carrier, self.offsets.write)?;
        get_attr(&self.namespace(), write)?.call(vec![Value::str(name), value])
    }

    /// `get_value` as a function value.
    pub fn get_value_fn(&self) -> Result<Func> {
        let read = get_attr(
            &self.namespace(),
            self.capability(TypeKind::Carrier, self.offsets.read)?,
        )?;
        Ok(Func::new("get_value", move |args| match args.as_slice() {
            [name] => read.call(vec![name.clone()]),
            _ => Err(RuntimeError::arity("get_value", "1", args.len())),
        }))
    }

    /// Curried `set_value`: `set_value_fn(name)(value)`.
    pub fn set_value_fn(&self, name: &str) -> Result<Func> {
        let write = get_attr(
            &self.namespace(),
            self.capability(TypeKind::Carrier, self.offsets.write)?,
        )?;
        let key = Value::str(name);
        Ok(Func::new(&format!("set_value({name})"), move |args| {
            match args.as_slice() {
                [value] => write.call(vec![key.clone(), value.clone()]),
                _ => Err(RuntimeError::arity("set_value", "1", args.len())),
            }
        }))
    }

    /// Publish the carrier's append/read/write identifiers as `A`, `G` and `S`.
    pub fn seed_capability_bindings(&self) -> Result<()> {
        let slots = [
            (65, self.offsets.append),
            (71, self.offsets.read),
            (83, self.offsets.write),
        ];
        for (code_point, offset) in slots {
            let name = reflect::chr(vec![Value::Int(code_point)])?;
            let identifier = self.capability(TypeKind::Carrier, offset)?;
            self.set_value(name.expect_str("binding name")?, Value::str(identifier))?;
        }
        Ok(())
    }

    /// Evaluate program text in the top-level scope.
    pub fn eval_text(&self, text: &str) -> Result<Value> {
        eval::eval_text(self, text)
    }

    /// Enter one evaluation level. Nested `eval_text` calls count against the same limit.
    pub(crate) fn enter_eval(&self, max_depth: usize) -> Result<EvalFrame> {
        let depth = self.eval_depth.get();
        if depth >= max_depth {
            return Err(RuntimeError::new(
                ErrorKind::Budget,
                format!("evaluation nests deeper than {max_depth}"),
            ));
        }
        self.eval_depth.set(depth + 1);
        Ok(EvalFrame {
            depth: self.eval_depth.clone(),
        })
    }

    pub(crate) fn cached_payload(&self, digest: &str) -> Option<Bindings> {
        self.payloads.borrow().get(digest).cloned()
    }

    pub(crate) fn remember_payload(&self, digest: String, bindings: Bindings) {
        self.payloads.borrow_mut().insert(digest, bindings);
    }

    pub fn loaded_payloads(&self) -> usize {
        self.payloads.borrow().len()
    }
}
