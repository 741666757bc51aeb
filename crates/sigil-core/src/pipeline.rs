use crate::error::Result;
use crate::library::Library;
use crate::value::Value;

/// Stages written top-to-bottom, applied bottom-up to a seed.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Value>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, f: Value) -> Self {
        self.stages.push(f);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The composed function; an empty pipeline is identity.
    pub fn build(&self, lib: &Library) -> Result<Value> {
        lib.compose(self.stages.iter().cloned())
    }

    pub fn run(&self, lib: &Library, seed: Value) -> Result<Value> {
        self.build(lib)?.call(vec![seed])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Runtime;
    use crate::value::Func;

    fn tag(label: &'static str) -> Value {
        Value::Func(Func::new(label, move |args| {
            let s = args[0].expect_str(label)?;
            Ok(Value::str(format!("{s}{label}")))
        }))
    }

    #[test]
    fn bottom_stage_runs_first() {
        let rt = Runtime::default();
        let lib = Library::load(&rt).unwrap();
        let p = Pipeline::new().stage(tag("a")).stage(tag("b")).stage(tag("c"));
        assert_eq!(p.len(), 3);
        assert_eq!(p.run(&lib, Value::str(">")).unwrap(), Value::str(">cba"));
        assert_eq!(
            Pipeline::new().run(&lib, Value::Int(4)).unwrap(),
            Value::Int(4)
        );
    }
}
