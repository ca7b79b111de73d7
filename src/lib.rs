pub mod ast;
pub mod error;
pub mod graph;
pub mod instance;
pub mod query;
pub mod schema;
pub mod session;
pub mod value;

pub use query::compile_find;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::error::*;
    pub use crate::instance::Instance;
    pub use crate::query::{FindOptions, compile_find};
    pub use crate::schema::{EntityDef, FieldDef, FieldKind, Registry, Relation, ScalarType};
    pub use crate::session::{Adapter, Row, Session};
    pub use crate::value::Value;
}
