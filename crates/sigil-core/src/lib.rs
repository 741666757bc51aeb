pub mod accumulator;
pub mod ast;
pub mod bootstrap;
pub mod capability;
pub mod combinator;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod eval;
pub mod language;
pub mod library;
pub mod offsets;
pub mod pipeline;
pub mod reflect;
pub mod runtime;
pub mod textops;
pub mod value;

mod util;
