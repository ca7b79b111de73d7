use pretty_assertions::assert_eq;

use super::{crm_registry, pairs};
use crate::error::StrataError;
use crate::query::{FindOptions, compile_find};
use crate::schema::{EntityDef, FieldDef, Registry, Relation, ScalarType};

#[test]
fn test_eager_collection_joins_before_the_parent_chain() {
    let registry = crm_registry();
    let query = compile_find(&registry, "Client", FindOptions::new()).unwrap();

    assert_eq!(
        query.columns,
        pairs(&[
            ("Client.name", "Client_name"),
            ("Representative0.id", "Representative0_id"),
            ("Representative0.client_id", "Representative0_client_id"),
            ("User0.id", "User0_id"),
        ])
    );

    assert_eq!(query.joins.len(), 2);
    let reps = &query.joins[0];
    assert_eq!(reps.to, "representatives");
    assert_eq!(reps.alias, "Representative0");
    // One-to-many pivots on the source's key, inherited here from User.
    assert_eq!(reps.on, pairs(&[("Client.id", "Representative0.client_id")]));
    let parent = &query.joins[1];
    assert_eq!(parent.to, "users");
    assert_eq!(parent.on, pairs(&[("Client.id", "User0.id")]));
}

#[test]
fn test_lazy_collection_is_invisible() {
    let mut registry = Registry::new();
    registry
        .define(
            EntityDef::new("Client")
                .table("clients")
                .field(FieldDef::scalar("id", ScalarType::Int).primary())
                .field(
                    FieldDef::reference("orders", "Order", Relation::OneToMany)
                        .mapped_by("client"),
                ),
        )
        .unwrap();
    registry
        .define(
            EntityDef::new("Order")
                .table("orders")
                .field(FieldDef::scalar("id", ScalarType::Int).primary())
                .field(
                    FieldDef::reference("client", "Client", Relation::ManyToOne)
                        .column("client_id"),
                ),
        )
        .unwrap();
    let query = compile_find(&registry, "Client", FindOptions::new()).unwrap();
    assert_eq!(query.columns, pairs(&[("Client.id", "Client_id")]));
    assert!(query.joins.is_empty());
}

#[test]
fn test_excluding_an_eager_collection_suppresses_its_join() {
    let registry = crm_registry();
    let query = compile_find(&registry, "Client", FindOptions::new().exclude("reps")).unwrap();
    assert_eq!(
        query.columns,
        pairs(&[("Client.name", "Client_name"), ("User0.id", "User0_id")])
    );
    assert_eq!(query.joins.len(), 1);
    assert_eq!(query.joins[0].to, "users");
}

#[test]
fn test_collection_without_mapped_by_is_rejected() {
    let mut registry = Registry::new();
    registry
        .define(
            EntityDef::new("Client")
                .table("clients")
                .field(FieldDef::scalar("id", ScalarType::Int).primary())
                .field(FieldDef::reference("orders", "Order", Relation::OneToMany).eager()),
        )
        .unwrap();
    registry
        .define(
            EntityDef::new("Order")
                .table("orders")
                .field(FieldDef::scalar("id", ScalarType::Int).primary()),
        )
        .unwrap();
    let err = compile_find(&registry, "Client", FindOptions::new()).unwrap_err();
    assert!(matches!(err, StrataError::InvalidRelation { .. }));
}
