//! Schema metadata: entity and field definitions plus the registry that
//! makes them resolvable by name.

pub mod entity;
pub mod field;
pub mod registry;

pub use self::entity::EntityDef;
pub use self::field::{FieldDef, FieldKind, Relation, ScalarType};
pub use self::registry::Registry;
