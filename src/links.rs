//! Hypermedia links embedded in resource representations.

use libris_authz::{Principal, Role};
use serde_json::{json, Map, Value};

use crate::serialization::Entity;

/// `_links` object for one resource.
///
/// `self` is always present. `update` and `delete` are only advertised to
/// callers allowed to perform them.
pub fn resource_links(entity: Entity, id: i64, principal: &Principal) -> Value {
    let href = format!("{}/{}", entity.base_path(), id);

    let mut links = Map::new();
    links.insert("self".to_string(), json!({ "href": href, "method": "GET" }));

    if can_manage(principal) {
        links.insert("update".to_string(), json!({ "href": href, "method": "PUT" }));
        links.insert("delete".to_string(), json!({ "href": href, "method": "DELETE" }));
    }

    Value::Object(links)
}

/// Whether `principal` may create, update, or delete resources.
pub fn can_manage(principal: &Principal) -> bool {
    principal.is_granted(Role::Admin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_callers_only_get_self() {
        let links = resource_links(Entity::Book, 4, &Principal::anonymous());
        assert_eq!(
            links,
            json!({ "self": { "href": "/api/books/4", "method": "GET" } })
        );
    }

    #[test]
    fn plain_users_cannot_see_write_links() {
        let user = Principal::new("user@bookapi.com", vec![Role::User]);
        let links = resource_links(Entity::Author, 2, &user);
        assert!(links.get("update").is_none());
        assert!(links.get("delete").is_none());
    }

    #[test]
    fn admins_get_write_links() {
        let admin = Principal::new("admin@bookapi.com", vec![Role::Admin]);
        let links = resource_links(Entity::Author, 2, &admin);
        assert_eq!(links["self"]["href"], "/api/authors/2");
        assert_eq!(links["update"]["method"], "PUT");
        assert_eq!(links["delete"]["href"], "/api/authors/2");
    }
}
