//! Field exposure rules for API representations.
//!
//! Every exposed field is listed once in a static table with the groups it
//! belongs to and the API version that introduced it. Rendering happens in
//! two steps:
//!
//! 1. [`project`] keeps the fields of one group. The result does not depend on
//!    the caller, so list pages are cached in this form.
//! 2. [`render`] removes fields newer than the requested version and attaches
//!    hypermedia links for the caller.

use libris_authz::Principal;
use libris_http::versioning::ApiVersion;
use serde_json::{Map, Value};

use crate::links;

/// Named field subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    /// Book-centric views: books with their author embedded.
    Books,
    /// Author-centric views: authors with the ids of their books.
    Authors,
}

impl Group {
    pub fn name(self) -> &'static str {
        match self {
            Group::Books => "getBooks",
            Group::Authors => "getAuthors",
        }
    }
}

/// Exposed resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Book,
    Author,
}

impl Entity {
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            Entity::Book => BOOK_FIELDS,
            Entity::Author => AUTHOR_FIELDS,
        }
    }

    /// Collection path the resource is served under.
    pub fn base_path(self) -> &'static str {
        match self {
            Entity::Book => "/api/books",
            Entity::Author => "/api/authors",
        }
    }
}

/// Exposure metadata for one field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub groups: &'static [Group],
    /// First API version the field is visible in; `None` means always.
    pub since: Option<ApiVersion>,
    /// Entity embedded in this field, gated with its own table.
    pub nested: Option<Entity>,
}

impl FieldSpec {
    pub fn in_group(&self, group: Group) -> bool {
        self.groups.contains(&group)
    }

    pub fn visible_in(&self, version: ApiVersion) -> bool {
        self.since.is_none_or(|since| version >= since)
    }
}

const BOTH: &[Group] = &[Group::Books, Group::Authors];
const BOOKS_ONLY: &[Group] = &[Group::Books];
const AUTHORS_ONLY: &[Group] = &[Group::Authors];

pub const BOOK_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "id",
        groups: BOTH,
        since: None,
        nested: None,
    },
    FieldSpec {
        name: "title",
        groups: BOOKS_ONLY,
        since: None,
        nested: None,
    },
    FieldSpec {
        name: "coverText",
        groups: BOOKS_ONLY,
        since: None,
        nested: None,
    },
    FieldSpec {
        name: "author",
        groups: BOOKS_ONLY,
        since: None,
        nested: Some(Entity::Author),
    },
    FieldSpec {
        name: "comment",
        groups: BOOKS_ONLY,
        since: Some(ApiVersion::new(2, 0, 0)),
        nested: None,
    },
];

pub const AUTHOR_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "id",
        groups: BOTH,
        since: None,
        nested: None,
    },
    FieldSpec {
        name: "firstName",
        groups: BOTH,
        since: None,
        nested: None,
    },
    FieldSpec {
        name: "lastName",
        groups: BOTH,
        since: None,
        nested: None,
    },
    FieldSpec {
        name: "books",
        groups: AUTHORS_ONLY,
        since: None,
        nested: Some(Entity::Book),
    },
];

/// Build an object holding the `group` fields of `entity`, in table order.
pub fn project<F>(entity: Entity, group: Group, mut value_of: F) -> Map<String, Value>
where
    F: FnMut(&'static str) -> Value,
{
    entity
        .fields()
        .iter()
        .filter(|field| field.in_group(group))
        .map(|field| (field.name.to_string(), value_of(field.name)))
        .collect()
}

/// Drop fields introduced after `version`, including inside embedded entities.
pub fn gate(object: &mut Map<String, Value>, entity: Entity, version: ApiVersion) {
    for field in entity.fields() {
        if !field.visible_in(version) {
            object.remove(field.name);
            continue;
        }
        let Some(nested) = field.nested else {
            continue;
        };
        match object.get_mut(field.name) {
            Some(Value::Object(inner)) => gate(inner, nested, version),
            Some(Value::Array(items)) => {
                for item in items {
                    if let Value::Object(inner) = item {
                        gate(inner, nested, version);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Per-request rendering inputs.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub version: ApiVersion,
    pub principal: &'a Principal,
}

/// Finish a projected object for one caller: version gate, then `_links`.
pub fn render(mut object: Map<String, Value>, entity: Entity, ctx: &RenderContext<'_>) -> Value {
    gate(&mut object, entity, ctx.version);
    if let Some(id) = object.get("id").and_then(Value::as_i64) {
        object.insert(
            "_links".to_string(),
            links::resource_links(entity, id, ctx.principal),
        );
    }
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(token: &str) -> ApiVersion {
        token.parse().unwrap()
    }

    fn sample_book(group: Group) -> Map<String, Value> {
        project(Entity::Book, group, |field| match field {
            "id" => json!(7),
            "title" => json!("Livre 7"),
            "coverText" => json!("Quatrième de couverture"),
            "comment" => json!("Commentaire"),
            "author" => json!({"id": 1, "firstName": "Prénom 1", "lastName": "Nom 1"}),
            _ => Value::Null,
        })
    }

    #[test]
    fn projection_follows_group_membership() {
        let books_view = sample_book(Group::Books);
        let keys: Vec<&str> = books_view.keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 5);
        for key in ["id", "title", "coverText", "author", "comment"] {
            assert!(keys.contains(&key), "{key}");
        }

        let authors_view = sample_book(Group::Authors);
        assert_eq!(Value::Object(authors_view), json!({"id": 7}));
    }

    #[test]
    fn comment_is_hidden_below_2_0() {
        let mut object = sample_book(Group::Books);
        gate(&mut object, Entity::Book, v("1.0"));
        assert!(!object.contains_key("comment"));
        assert!(object.contains_key("title"));

        let mut object = sample_book(Group::Books);
        gate(&mut object, Entity::Book, v("2.0"));
        assert_eq!(object["comment"], "Commentaire");

        let mut object = sample_book(Group::Books);
        gate(&mut object, Entity::Book, v("2.1"));
        assert!(object.contains_key("comment"));
    }

    #[test]
    fn gating_recurses_into_embedded_books() {
        let mut author = project(Entity::Author, Group::Authors, |field| match field {
            "id" => json!(1),
            "firstName" => json!("Prénom 1"),
            "lastName" => json!("Nom 1"),
            "books" => json!([{"id": 3, "comment": "leaked"}, {"id": 4}]),
            _ => Value::Null,
        });
        gate(&mut author, Entity::Author, v("1.0"));
        assert_eq!(author["books"], json!([{"id": 3}, {"id": 4}]));
    }

    #[test]
    fn render_attaches_links() {
        let principal = Principal::anonymous();
        let ctx = RenderContext {
            version: v("1.0"),
            principal: &principal,
        };
        let rendered = render(sample_book(Group::Books), Entity::Book, &ctx);
        assert_eq!(rendered["_links"]["self"]["href"], "/api/books/7");
        assert!(rendered.get("comment").is_none());
    }

    #[test]
    fn group_names_match_wire_names() {
        assert_eq!(Group::Books.name(), "getBooks");
        assert_eq!(Group::Authors.name(), "getAuthors");
    }
}
