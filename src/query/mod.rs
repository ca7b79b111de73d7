//! Query compilation: find queries and per-table mutation payloads.

pub mod find;
pub mod joins;
pub mod mutation;

pub use self::find::{FindOptions, FindQueryBuilder, compile_find};
pub use self::joins::{AliasAllocator, JoinClause};
pub use self::mutation::{changed_fields, delete_payloads, insert_payloads, update_payloads};

#[cfg(test)]
mod tests;
