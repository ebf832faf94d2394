//! Query translation for the datacat data API.
//!
//! Raw request parameters are compiled into an immutable
//! [`datacat_core::Filter`] and a normalized [`PageRequest`]; [`paginate`]
//! then runs the count-then-fetch pair against a document store.

pub mod classify;
pub mod compiler;
pub mod pagination;

pub use classify::{classify, parse_iso8601};
pub use compiler::{compile_value, CompiledQuery, FilterCompiler};
pub use pagination::{paginate, PageRequest, Paginated, Pagination};
