//! XPath 1.0 Engine
//!
//! XPath 1.0 implementation with:
//! - All axes except `namespace`
//! - The core function library
//! - Compiled expression caching

pub mod axes;
pub mod cache;
pub mod compiler;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use cache::XPathCache;
pub use compiler::{compile, CompiledExpr};
pub use eval::{evaluate, evaluate_compiled, evaluate_from_node, EvalContext};
pub use value::{AttributeValue, XPathValue};
