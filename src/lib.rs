pub use crate::codegen::{generate, CodeGenerator, GeneratorOptions};
pub use crate::errors::{CarinataError, ErrorCategory, ErrorKind, SourceContext};
pub use crate::parser::{parse, parse_seeded};

pub mod ast;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod errors;
pub mod naming;
pub mod parser;
pub mod suite;
