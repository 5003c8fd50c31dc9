use serde::Deserialize;
use serde_json::{json, Map, Value};

use libris_http::FieldError;

use crate::serialization::{project, Entity, Group};
use crate::utils::Validator;

/// A book with its author, if any, resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub cover_text: String,
    pub comment: Option<String>,
    pub author: Option<BookAuthor>,
}

/// The author embedded in a book representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookAuthor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

impl Book {
    pub fn project(&self, group: Group) -> Map<String, Value> {
        project(Entity::Book, group, |field| match field {
            "id" => json!(self.id),
            "title" => json!(self.title),
            "coverText" => json!(self.cover_text),
            "comment" => json!(self.comment),
            "author" => self
                .author
                .as_ref()
                .map_or(Value::Null, |author| Value::Object(author.project(group))),
            _ => Value::Null,
        })
    }
}

impl BookAuthor {
    fn project(&self, group: Group) -> Map<String, Value> {
        project(Entity::Author, group, |field| match field {
            "id" => json!(self.id),
            "firstName" => json!(self.first_name),
            "lastName" => json!(self.last_name),
            _ => Value::Null,
        })
    }
}

/// Request body of `POST /api/books` and `PUT /api/books/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPayload {
    pub title: Option<String>,
    pub cover_text: Option<String>,
    pub comment: Option<String>,
    /// Integer or numeric string. Anything else means no author.
    pub id_author: Option<Value>,
}

/// Validated column values of a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub cover_text: String,
    pub comment: Option<String>,
}

impl BookPayload {
    pub fn validate(self) -> Result<(BookDraft, Option<i64>), Vec<FieldError>> {
        let author_id = self.author_id();

        let mut validator = Validator::new();
        let title = validator.required_text("title", self.title);
        let cover_text = validator.present_text("coverText", self.cover_text);
        let comment = validator.optional_text("comment", self.comment);

        validator.finish((
            BookDraft {
                title,
                cover_text,
                comment,
            },
            author_id,
        ))
    }

    fn author_id(&self) -> Option<i64> {
        match self.id_author.as_ref()? {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(body: Value) -> BookPayload {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn valid_payload_produces_draft() {
        let (draft, author) = payload(json!({
            "title": "Le Seigneur des anneaux",
            "coverText": "Un anneau pour les gouverner tous",
            "idAuthor": 5
        }))
        .validate()
        .unwrap();

        assert_eq!(draft.title, "Le Seigneur des anneaux");
        assert_eq!(draft.comment, None);
        assert_eq!(author, Some(5));
    }

    #[test]
    fn empty_title_is_rejected() {
        let errors = payload(json!({ "title": "", "coverText": "x" }))
            .validate()
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "title");
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let errors = payload(json!({})).validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "coverText"]);
    }

    #[test]
    fn id_author_accepts_numeric_strings_only() {
        let author = |value: Value| {
            payload(json!({ "title": "t", "coverText": "c", "idAuthor": value }))
                .validate()
                .unwrap()
                .1
        };
        assert_eq!(author(json!("12")), Some(12));
        assert_eq!(author(json!("douze")), None);
        assert_eq!(author(json!(null)), None);
        assert_eq!(author(json!(1.5)), None);
    }

    #[test]
    fn books_group_embeds_author_names() {
        let book = Book {
            id: 1,
            title: "Livre 1".to_string(),
            cover_text: "Quatrième".to_string(),
            comment: Some("Bon".to_string()),
            author: Some(BookAuthor {
                id: 9,
                first_name: "Prénom".to_string(),
                last_name: "Nom".to_string(),
            }),
        };

        let projected = Value::Object(book.project(Group::Books));
        assert_eq!(
            projected,
            json!({
                "id": 1,
                "title": "Livre 1",
                "coverText": "Quatrième",
                "author": { "id": 9, "firstName": "Prénom", "lastName": "Nom" },
                "comment": "Bon"
            })
        );
    }

    #[test]
    fn missing_author_serializes_as_null() {
        let book = Book {
            id: 2,
            title: "Livre 2".to_string(),
            cover_text: String::new(),
            comment: None,
            author: None,
        };
        assert_eq!(book.project(Group::Books)["author"], Value::Null);
    }
}
