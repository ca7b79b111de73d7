//! Entity-graph path resolution.
//!
//! A graph path is a dot-delimited walk from a root entity through relation
//! fields, terminating at either an entity or a scalar field:
//! `Post.author.name` visits the `Post` entity, the `author` relation (a
//! `User`), and the scalar `name`.
//!
//! Resolution is deliberately permissive: every failure (malformed path,
//! wrong root, unknown field mid-walk) comes back as `None` rather than an
//! error, because "this path does not exist" is an expected outcome that the
//! query compiler checks for constantly while deciding what to join.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char},
    combinator::{all_consuming, recognize},
    multi::{many0_count, separated_list1},
    sequence::pair,
};

use crate::schema::{EntityDef, FieldKind, Registry, ScalarType};

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn segments(input: &str) -> IResult<&str, Vec<&str>> {
    separated_list1(char('.'), identifier)(input)
}

/// Split a graph path into identifier segments. `None` when the path is
/// empty or malformed (leading/trailing/doubled dots, non-identifier
/// characters).
pub fn parse_path(path: &str) -> Option<Vec<&str>> {
    all_consuming(segments)(path).ok().map(|(_, segs)| segs)
}

/// What a resolved graph node points at.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphTarget {
    /// The node is an entity (the root, or a relation field's target),
    /// identified by name.
    Entity(String),
    /// The node is a terminal scalar field.
    Scalar(ScalarType),
}

/// One node in a resolved entity graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// The path segment that names this node.
    pub key: String,
    /// The entity or scalar the segment resolved to.
    pub target: GraphTarget,
}

/// Resolve `path` against `root`, returning one node per segment with the
/// root node first.
///
/// Two path flavors are accepted: fully qualified (`Post.author`, first
/// segment is the root's own name) and root-relative (`author`). Field
/// lookup at each hop searches the entity's whole inheritance chain. A
/// scalar field ends the walk; trailing segments after it make the path
/// unresolvable.
pub fn resolve(registry: &Registry, root: &EntityDef, path: &str) -> Option<Vec<GraphNode>> {
    let mut segs = parse_path(path)?;
    if segs.first() == Some(&root.name.as_str()) {
        segs.remove(0);
    }

    let mut nodes = vec![GraphNode {
        key: root.name.clone(),
        target: GraphTarget::Entity(root.name.clone()),
    }];

    let mut current = root;
    let mut iter = segs.iter().peekable();
    while let Some(seg) = iter.next() {
        let field = registry.field(current, seg)?;
        match &field.kind {
            FieldKind::Ref { entity, .. } => {
                nodes.push(GraphNode {
                    key: (*seg).to_string(),
                    target: GraphTarget::Entity(entity.clone()),
                });
                // A dangling ref makes the rest of the walk unresolvable.
                current = registry.get(entity).ok()?;
            }
            FieldKind::Scalar(typ) => {
                if iter.peek().is_some() {
                    return None;
                }
                nodes.push(GraphNode {
                    key: (*seg).to_string(),
                    target: GraphTarget::Scalar(*typ),
                });
            }
        }
    }
    Some(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, Relation};

    fn fixture() -> Registry {
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
                    .field(
                        FieldDef::reference("author", "User", Relation::ManyToOne)
                            .column("author_id"),
                    ),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(parse_path("Post.author.name").unwrap().len(), 3);
        assert_eq!(parse_path("author").unwrap(), vec!["author"]);
        assert!(parse_path("").is_none());
        assert!(parse_path("Post..author").is_none());
        assert!(parse_path(".author").is_none());
        assert!(parse_path("Post.author.").is_none());
    }

    #[test]
    fn test_resolve_fully_qualified() {
        let registry = fixture();
        let post = registry.get("Post").unwrap();
        let nodes = resolve(&registry, post, "Post.author.name").unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].key, "Post");
        assert_eq!(nodes[1].target, GraphTarget::Entity("User".to_string()));
        assert_eq!(nodes[2].target, GraphTarget::Scalar(ScalarType::Text));
    }

    #[test]
    fn test_resolve_root_relative() {
        let registry = fixture();
        let post = registry.get("Post").unwrap();
        let nodes = resolve(&registry, post, "author").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].key, "author");
    }

    #[test]
    fn test_resolve_single_segment_root() {
        let registry = fixture();
        let post = registry.get("Post").unwrap();
        let nodes = resolve(&registry, post, "Post").unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_unknown_field_is_absence_not_error() {
        let registry = fixture();
        let post = registry.get("Post").unwrap();
        assert!(resolve(&registry, post, "Post.reviewer").is_none());
        assert!(resolve(&registry, post, "Post.author.nickname").is_none());
    }

    #[test]
    fn test_scalar_must_terminate_walk() {
        let registry = fixture();
        let post = registry.get("Post").unwrap();
        assert!(resolve(&registry, post, "Post.author.name.length").is_none());
    }
}
