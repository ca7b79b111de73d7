use pretty_assertions::assert_eq;

use super::pairs;
use crate::error::StrataError;
use crate::query::joins::inheritance_join;
use crate::query::{FindOptions, compile_find};
use crate::schema::{EntityDef, FieldDef, Registry, ScalarType};
use crate::value::Value;

fn staff_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .define(
            EntityDef::new("User")
                .table("users")
                .field(FieldDef::scalar("id", ScalarType::Int).primary())
                .field(FieldDef::scalar("role", ScalarType::Text)),
        )
        .unwrap();
    registry
        .define(
            EntityDef::new("Employee")
                .table("employees")
                .extends("User")
                .field(FieldDef::scalar("badge", ScalarType::Text)),
        )
        .unwrap();
    registry
        .define(
            EntityDef::new("Manager")
                .table("managers")
                .extends("Employee")
                .field(FieldDef::scalar("level", ScalarType::Int)),
        )
        .unwrap();
    registry
}

#[test]
fn test_child_joins_its_parent_over_the_shared_key() {
    let registry = staff_registry();
    let query = compile_find(&registry, "Employee", FindOptions::new()).unwrap();
    assert_eq!(query.from, "employees");
    assert_eq!(query.alias, "Employee");
    assert_eq!(
        query.columns,
        pairs(&[
            ("Employee.badge", "Employee_badge"),
            ("User0.id", "User0_id"),
            ("User0.role", "User0_role"),
        ])
    );
    assert_eq!(query.joins.len(), 1);
    let join = &query.joins[0];
    assert_eq!(join.to, "users");
    assert_eq!(join.alias, "User0");
    // The child declares no key of its own, so it borrows the parent's.
    assert_eq!(join.on, pairs(&[("Employee.id", "User0.id")]));
}

#[test]
fn test_chain_of_three_joins_link_by_link() {
    let registry = staff_registry();
    let query = compile_find(&registry, "Manager", FindOptions::new()).unwrap();
    assert_eq!(query.joins.len(), 2);
    assert_eq!(query.joins[0].to, "employees");
    assert_eq!(query.joins[0].on, pairs(&[("Manager.id", "Employee0.id")]));
    assert_eq!(query.joins[1].to, "users");
    assert_eq!(query.joins[1].on, pairs(&[("Employee0.id", "User0.id")]));
    assert_eq!(
        query.columns,
        pairs(&[
            ("Manager.level", "Manager_level"),
            ("Employee0.badge", "Employee0_badge"),
            ("User0.id", "User0_id"),
            ("User0.role", "User0_role"),
        ])
    );
}

#[test]
fn test_condition_on_an_inherited_field_uses_the_parent_alias() {
    let registry = staff_registry();
    let query = compile_find(
        &registry,
        "Employee",
        FindOptions::new().filter("role", "admin"),
    )
    .unwrap();
    let conditions = query.conditions.unwrap();
    assert_eq!(conditions.get("User0.role"), Some(&Value::from("admin")));
}

#[test]
fn test_condition_on_an_own_field_uses_the_root_alias() {
    let registry = staff_registry();
    let query = compile_find(
        &registry,
        "Employee",
        FindOptions::new().filter("badge", "b-7"),
    )
    .unwrap();
    let conditions = query.conditions.unwrap();
    assert_eq!(conditions.get("Employee.badge"), Some(&Value::from("b-7")));
}

#[test]
fn test_declaring_a_key_under_a_keyless_parent_is_rejected() {
    let mut registry = Registry::new();
    registry
        .define(
            EntityDef::new("Draft")
                .table("drafts")
                .field(FieldDef::scalar("title", ScalarType::Text)),
        )
        .unwrap();
    let err = registry
        .define(
            EntityDef::new("Published")
                .table("published")
                .extends("Draft")
                .field(FieldDef::scalar("id", ScalarType::Int).primary()),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        StrataError::PrimaryKeyMismatch { child, parent } if child == "Published" && parent == "Draft"
    ));
}

#[test]
fn test_keyless_chain_cannot_compile_an_inheritance_join() {
    let mut registry = Registry::new();
    registry
        .define(
            EntityDef::new("Draft")
                .table("drafts")
                .field(FieldDef::scalar("title", ScalarType::Text)),
        )
        .unwrap();
    registry
        .define(
            EntityDef::new("Published")
                .table("published")
                .extends("Draft")
                .field(FieldDef::scalar("url", ScalarType::Text)),
        )
        .unwrap();
    let err = compile_find(&registry, "Published", FindOptions::new()).unwrap_err();
    assert!(matches!(err, StrataError::MissingPrimaryKey(entity) if entity == "Draft"));
}

#[test]
fn test_diverging_key_cardinalities_fail_the_join() {
    let registry = Registry::new();
    let parent = EntityDef::new("Base")
        .table("base")
        .field(FieldDef::scalar("id", ScalarType::Int).primary());
    let child = EntityDef::new("Pair")
        .table("pairs")
        .field(FieldDef::scalar("a", ScalarType::Int).primary())
        .field(FieldDef::scalar("b", ScalarType::Int).primary());
    let err = inheritance_join(&registry, &child, &parent, "Pair", "Base0").unwrap_err();
    assert!(matches!(
        err,
        StrataError::PrimaryKeyMismatch { child, parent } if child == "Pair" && parent == "Base"
    ));
}

#[test]
fn test_inherited_fields_can_be_excluded_by_path() {
    let registry = staff_registry();
    let query = compile_find(
        &registry,
        "Employee",
        FindOptions::new().exclude("role"),
    )
    .unwrap();
    assert_eq!(
        query.columns,
        pairs(&[("Employee.badge", "Employee_badge"), ("User0.id", "User0_id")])
    );
}
