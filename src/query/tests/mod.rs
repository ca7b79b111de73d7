//! Shared schema fixtures for the compiler tests.

mod inheritance;
mod one_to_many;

use crate::schema::{EntityDef, FieldDef, Registry, Relation, ScalarType};

/// Build an owned pair list from string literals, for comparing column lists
/// and join predicates.
pub fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

/// Users and posts; `Post.author` is a lazy many-to-one.
pub fn blog_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .define(
            EntityDef::new("User")
                .table("users")
                .field(FieldDef::scalar("id", ScalarType::Int).primary())
                .field(FieldDef::scalar("name", ScalarType::Text)),
        )
        .unwrap();
    registry
        .define(
            EntityDef::new("Post")
                .table("posts")
                .field(FieldDef::scalar("id", ScalarType::Int).primary())
                .field(FieldDef::scalar("title", ScalarType::Text))
                .field(
                    FieldDef::reference("author", "User", Relation::ManyToOne).column("author_id"),
                ),
        )
        .unwrap();
    registry
}

/// A three-table inheritance chain with an eager one-to-many off the middle:
/// `Client` extends `User`, representatives point back at clients.
pub fn crm_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .define(
            EntityDef::new("User")
                .table("users")
                .field(FieldDef::scalar("id", ScalarType::Int).primary()),
        )
        .unwrap();
    registry
        .define(
            EntityDef::new("Client")
                .table("clients")
                .extends("User")
                .field(FieldDef::scalar("name", ScalarType::Text))
                .field(
                    FieldDef::reference("reps", "Representative", Relation::OneToMany)
                        .mapped_by("client")
                        .eager(),
                ),
        )
        .unwrap();
    registry
        .define(
            EntityDef::new("Representative")
                .table("representatives")
                .field(FieldDef::scalar("id", ScalarType::Int).primary())
                .field(
                    FieldDef::reference("client", "Client", Relation::ManyToOne)
                        .column("client_id"),
                ),
        )
        .unwrap();
    registry
}

/// Books and authors linked many-to-many, owning side on `Book.authors`.
pub fn library_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .define(
            EntityDef::new("Book")
                .table("books")
                .field(FieldDef::scalar("id", ScalarType::Int).primary())
                .field(FieldDef::reference("authors", "Author", Relation::ManyToMany)),
        )
        .unwrap();
    registry
        .define(
            EntityDef::new("Author")
                .table("authors")
                .field(FieldDef::scalar("id", ScalarType::Int).primary())
                .field(
                    FieldDef::reference("books", "Book", Relation::ManyToMany)
                        .mapped_by("authors"),
                ),
        )
        .unwrap();
    registry
}
