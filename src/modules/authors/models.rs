use serde::Deserialize;
use serde_json::{json, Map, Value};

use libris_http::FieldError;

use crate::serialization::{project, Entity, Group};
use crate::utils::Validator;

/// An author with the ids of the books referencing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub book_ids: Vec<i64>,
}

impl Author {
    pub fn project(&self, group: Group) -> Map<String, Value> {
        project(Entity::Author, group, |field| match field {
            "id" => json!(self.id),
            "firstName" => json!(self.first_name),
            "lastName" => json!(self.last_name),
            "books" => Value::Array(
                self.book_ids
                    .iter()
                    .map(|id| {
                        Value::Object(project(Entity::Book, group, |field| match field {
                            "id" => json!(id),
                            _ => Value::Null,
                        }))
                    })
                    .collect(),
            ),
            _ => Value::Null,
        })
    }
}

/// Request body of `POST /api/authors` and `PUT /api/authors/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorDraft {
    pub first_name: String,
    pub last_name: String,
}

impl AuthorPayload {
    pub fn validate(self) -> Result<AuthorDraft, Vec<FieldError>> {
        let mut validator = Validator::new();
        let first_name = validator.required_text("firstName", self.first_name);
        let last_name = validator.required_text("lastName", self.last_name);
        validator.finish(AuthorDraft {
            first_name,
            last_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> Author {
        Author {
            id: 3,
            first_name: "Prénom 3".to_string(),
            last_name: "Nom 3".to_string(),
            book_ids: vec![4, 11],
        }
    }

    #[test]
    fn authors_group_lists_book_ids() {
        assert_eq!(
            Value::Object(author().project(Group::Authors)),
            json!({
                "id": 3,
                "firstName": "Prénom 3",
                "lastName": "Nom 3",
                "books": [{ "id": 4 }, { "id": 11 }]
            })
        );
    }

    #[test]
    fn books_group_omits_book_list() {
        let projected = author().project(Group::Books);
        assert!(!projected.contains_key("books"));
        assert_eq!(projected["lastName"], "Nom 3");
    }

    #[test]
    fn names_are_required() {
        let payload: AuthorPayload =
            serde_json::from_value(json!({ "firstName": "Victor", "lastName": " " })).unwrap();
        let errors = payload.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "lastName");
    }
}
