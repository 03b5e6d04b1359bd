//! Compact representation of the permission ↔ role graph.
//!
//! A snapshot stores every attribute under a one-letter token instead of
//! its full name. Permission attributes draw tokens from `a`..`h`, role
//! attributes not already aliased draw from `j`..`p`, and the role links
//! of a permission sit under the reserved token `r`. Once a pool runs
//! out the attribute keeps its full name. Each role row is written once,
//! however many permissions reference it.
//!
//! ```text
//! {
//!   "alias": {"a": "id", "b": "code", "c": "guard_name", "r": "roles"},
//!   "permissions": [{"a": "…", "b": "edit-articles", "c": "web", "r": ["…"]}],
//!   "roles": [{"a": "…", "b": "writer", "c": "web"}]
//! }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use rolegate_core::models::permission::Permission;
use rolegate_core::models::record::{Attributes, Record};
use rolegate_core::models::role::Role;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::AuthzError;

/// Token holding a permission's role identifiers.
pub const ROLES_TOKEN: &str = "r";

/// Attribute name recorded for [`ROLES_TOKEN`] in the alias section.
pub const ROLES_RELATION: &str = "roles";

const PERMISSION_TOKENS: [&str; 8] = ["a", "b", "c", "d", "e", "f", "g", "h"];
const ROLE_TOKENS: [&str; 7] = ["j", "k", "l", "m", "n", "o", "p"];

/// Attribute name → token, filled while a snapshot is built.
#[derive(Debug, Default)]
struct AliasTable {
    tokens: HashMap<String, &'static str>,
}

impl AliasTable {
    /// Give every name that has no token yet the next free token from
    /// `pool`. Names left over after the pool is exhausted stay unaliased.
    fn extend<'a>(&mut self, names: impl IntoIterator<Item = &'a str>, pool: &[&'static str]) {
        let mut free = pool.iter();
        for name in names {
            if self.tokens.contains_key(name) {
                continue;
            }
            match free.next() {
                Some(token) => {
                    self.tokens.insert(name.to_owned(), token);
                }
                None => break,
            }
        }
    }

    fn alias_roles(&mut self) {
        self.tokens.insert(ROLES_RELATION.to_owned(), ROLES_TOKEN);
    }

    fn has_roles(&self) -> bool {
        self.tokens.contains_key(ROLES_RELATION)
    }

    /// Rewrite a row's keys to their tokens.
    fn compact_row(&self, attributes: Attributes) -> Attributes {
        attributes
            .into_iter()
            .map(|(name, value)| match self.tokens.get(&name) {
                Some(token) => ((*token).to_owned(), value),
                None => (name, value),
            })
            .collect()
    }

    /// Token → name, as stored in the snapshot.
    fn invert(self) -> BTreeMap<String, String> {
        self.tokens
            .into_iter()
            .map(|(name, token)| (token.to_owned(), name))
            .collect()
    }
}

fn retained(attributes: Attributes, excluded: &[String]) -> Attributes {
    attributes
        .into_iter()
        .filter(|(name, _)| !excluded.iter().any(|e| e == name))
        .collect()
}

/// Serialized form of the permission cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompactSnapshot {
    /// Token → full attribute name.
    pub alias: BTreeMap<String, String>,
    pub permissions: Vec<Attributes>,
    pub roles: Vec<Attributes>,
}

/// Compact `permissions` (with their roles attached) into a snapshot,
/// omitting every attribute named in `excluded`.
pub fn compact(permissions: &[Permission], excluded: &[String]) -> CompactSnapshot {
    let mut alias = AliasTable::default();
    let mut permissions_aliased = false;
    let mut seen_roles: HashSet<Uuid> = HashSet::new();
    let mut roles = Vec::new();
    let mut rows = Vec::with_capacity(permissions.len());

    for permission in permissions {
        let attributes = retained(permission.attributes(), excluded);
        if !permissions_aliased {
            alias.extend(attributes.keys().map(String::as_str), &PERMISSION_TOKENS);
            permissions_aliased = true;
        }
        let mut row = alias.compact_row(attributes);

        if !permission.roles.is_empty() {
            let mut role_keys = Vec::with_capacity(permission.roles.len());
            for role in &permission.roles {
                let attributes = retained(role.attributes(), excluded);
                if !alias.has_roles() {
                    alias.alias_roles();
                    alias.extend(attributes.keys().map(String::as_str), &ROLE_TOKENS);
                }
                if seen_roles.insert(role.id) {
                    roles.push(alias.compact_row(attributes));
                }
                role_keys.push(Value::String(role.key()));
            }
            row.insert(ROLES_TOKEN.to_owned(), Value::Array(role_keys));
        }

        rows.push(row);
    }

    CompactSnapshot {
        alias: alias.invert(),
        permissions: rows,
        roles,
    }
}

impl CompactSnapshot {
    pub fn to_value(&self) -> Result<Value, AuthzError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decode a cached value. A value whose `alias` section is absent,
    /// null or not a map is a legacy entry and yields
    /// [`AuthzError::MissingAlias`].
    pub fn from_value(value: Value) -> Result<Self, AuthzError> {
        match &value {
            Value::Object(map) if matches!(map.get("alias"), Some(Value::Object(_))) => {
                Ok(serde_json::from_value(value)?)
            }
            _ => Err(AuthzError::MissingAlias),
        }
    }

    fn expand(alias: &BTreeMap<String, String>, row: Attributes) -> Attributes {
        row.into_iter()
            .map(|(key, value)| match alias.get(&key) {
                Some(name) => (name.clone(), value),
                None => (key, value),
            })
            .collect()
    }

    /// Rebuild live records. Roles are hydrated first and attached to
    /// each permission in the order of its stored role list; identifiers
    /// with no matching role row are dropped.
    pub fn hydrate(self) -> Result<HydratedSnapshot, AuthzError> {
        let CompactSnapshot {
            alias,
            permissions: permission_rows,
            roles: role_rows,
        } = self;

        let mut roles: HashMap<String, Role> = HashMap::with_capacity(role_rows.len());
        for row in role_rows {
            let role = Role::from_attributes(Self::expand(&alias, row))?;
            roles.insert(role.key(), role);
        }

        let mut snapshot = HydratedSnapshot::default();
        for mut row in permission_rows {
            let role_keys = row.remove(ROLES_TOKEN);
            let mut permission = Permission::from_attributes(Self::expand(&alias, row))?;

            if let Some(Value::Array(keys)) = role_keys {
                permission.roles = keys
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(|key| roles.get(key).cloned())
                    .collect();
            }

            snapshot.push(permission);
        }

        Ok(snapshot)
    }
}

/// Hydrated permissions, in snapshot order, plus the indexes lookups
/// need.
#[derive(Debug, Clone, Default)]
pub struct HydratedSnapshot {
    permissions: Vec<Permission>,
    by_id: HashMap<Uuid, usize>,
    /// Role id → ids of the permissions granted to it.
    role_permissions: HashMap<Uuid, Vec<Uuid>>,
}

impl HydratedSnapshot {
    fn push(&mut self, permission: Permission) {
        for role in &permission.roles {
            self.role_permissions
                .entry(role.id)
                .or_default()
                .push(permission.id);
        }
        self.by_id.insert(permission.id, self.permissions.len());
        self.permissions.push(permission);
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Permission> {
        self.by_id.get(&id).map(|&index| &self.permissions[index])
    }

    /// Permissions granted to a role, in snapshot order.
    pub fn role_permissions(&self, role_id: Uuid) -> impl Iterator<Item = &Permission> {
        self.role_permissions
            .get(&role_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.get(*id))
    }

    pub fn role_has_permission(&self, role_id: Uuid, permission_id: Uuid) -> bool {
        self.role_permissions
            .get(&role_id)
            .is_some_and(|ids| ids.contains(&permission_id))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn excluded() -> Vec<String> {
        vec!["created_at".into(), "updated_at".into(), "deleted_at".into()]
    }

    fn role(code: &str) -> Role {
        Role {
            id: Uuid::new_v4(),
            code: code.into(),
            guard_name: "web".into(),
            description: None,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }

    fn permission(code: &str, roles: Vec<Role>) -> Permission {
        Permission {
            id: Uuid::new_v4(),
            code: code.into(),
            guard_name: "web".into(),
            description: Some(format!("{code} description")),
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
            roles,
        }
    }

    fn without_timestamps(mut permission: Permission) -> Permission {
        permission.created_at = None;
        permission.updated_at = None;
        for role in &mut permission.roles {
            role.created_at = None;
            role.updated_at = None;
        }
        permission
    }

    #[test]
    fn empty_graph_compacts_to_empty_sections() {
        let snapshot = compact(&[], &excluded());
        assert_eq!(
            snapshot.to_value().unwrap(),
            json!({"alias": {}, "permissions": [], "roles": []})
        );
        assert!(snapshot.hydrate().unwrap().is_empty());
    }

    #[test]
    fn tokens_follow_attribute_order() {
        let writer = role("writer");
        let snapshot = compact(&[permission("edit", vec![writer])], &excluded());

        let alias = &snapshot.alias;
        assert_eq!(alias["a"], "id");
        assert_eq!(alias["b"], "code");
        assert_eq!(alias["c"], "guard_name");
        assert_eq!(alias["d"], "description");
        assert_eq!(alias[ROLES_TOKEN], ROLES_RELATION);
        // Role attributes are all shared with permissions.
        assert!(!alias.contains_key("j"));
        assert!(!alias.values().any(|name| name == "created_at"));
    }

    #[test]
    fn excluded_fields_never_appear() {
        let snapshot = compact(&[permission("edit", vec![role("writer")])], &excluded());
        let value = snapshot.to_value().unwrap().to_string();
        assert!(!value.contains("created_at"));
        assert!(!value.contains("updated_at"));
    }

    #[test]
    fn permissions_without_roles_omit_the_roles_token() {
        let snapshot = compact(&[permission("edit", Vec::new())], &excluded());
        assert!(!snapshot.permissions[0].contains_key(ROLES_TOKEN));
        assert!(!snapshot.alias.contains_key(ROLES_TOKEN));
        assert!(snapshot.roles.is_empty());
    }

    #[test]
    fn shared_role_is_written_once() {
        let admin = role("admin");
        let p1 = permission("edit", vec![admin.clone()]);
        let p2 = permission("publish", vec![admin.clone()]);
        let snapshot = compact(&[p1, p2], &excluded());

        assert_eq!(snapshot.roles.len(), 1);
        let expected = json!([admin.id.to_string()]);
        assert_eq!(snapshot.permissions[0][ROLES_TOKEN], expected);
        assert_eq!(snapshot.permissions[1][ROLES_TOKEN], expected);
    }

    #[test]
    fn round_trip_restores_records_and_links() {
        let writer = role("writer");
        let admin = role("admin");
        let originals = vec![
            permission("edit", vec![admin.clone(), writer.clone()]),
            permission("publish", vec![admin.clone()]),
            permission("view", Vec::new()),
        ];

        let value = compact(&originals, &excluded()).to_value().unwrap();
        let hydrated = CompactSnapshot::from_value(value).unwrap().hydrate().unwrap();

        let expected: Vec<Permission> = originals.into_iter().map(without_timestamps).collect();
        assert_eq!(hydrated.permissions(), expected.as_slice());

        let admin_codes: Vec<&str> = hydrated
            .role_permissions(admin.id)
            .map(|p| p.code.as_str())
            .collect();
        assert_eq!(admin_codes, ["edit", "publish"]);
        assert!(hydrated.role_has_permission(writer.id, expected[0].id));
        assert!(!hydrated.role_has_permission(writer.id, expected[1].id));
    }

    #[test]
    fn unknown_role_ids_are_dropped() {
        let writer = role("writer");
        let mut snapshot = compact(&[permission("edit", vec![writer.clone()])], &excluded());
        snapshot.permissions[0].insert(
            ROLES_TOKEN.into(),
            json!([Uuid::new_v4().to_string(), writer.id.to_string()]),
        );

        let hydrated = snapshot.hydrate().unwrap();
        let roles = &hydrated.permissions()[0].roles;
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].id, writer.id);
    }

    #[test]
    fn pool_exhaustion_keeps_full_names() {
        let names = [
            "id", "code", "guard_name", "description", "team_id", "scope", "label", "level",
            "ninth",
        ];
        let mut alias = AliasTable::default();
        alias.extend(names, &PERMISSION_TOKENS);

        let row: Attributes = names
            .iter()
            .map(|name| ((*name).to_owned(), json!(name)))
            .collect();
        let compacted = alias.compact_row(row);

        assert_eq!(compacted["h"], json!("level"));
        assert_eq!(compacted["ninth"], json!("ninth"));
        assert_eq!(compacted.len(), 9);
    }

    #[test]
    fn role_only_attributes_use_the_role_pool() {
        let mut alias = AliasTable::default();
        alias.extend(["id", "code"], &PERMISSION_TOKENS);
        alias.alias_roles();
        alias.extend(["id", "code", "color"], &ROLE_TOKENS);

        let inverted = alias.invert();
        assert_eq!(inverted["a"], "id");
        assert_eq!(inverted["b"], "code");
        assert_eq!(inverted["j"], "color");
        assert_eq!(inverted[ROLES_TOKEN], ROLES_RELATION);
    }

    #[test]
    fn legacy_value_is_reported_as_missing_alias() {
        let legacy = json!({"permissions": [], "roles": []});
        assert!(matches!(
            CompactSnapshot::from_value(legacy),
            Err(AuthzError::MissingAlias)
        ));
        for alias in [Value::Null, json!("a"), json!([])] {
            let value = json!({"alias": alias, "permissions": [], "roles": []});
            assert!(matches!(
                CompactSnapshot::from_value(value),
                Err(AuthzError::MissingAlias)
            ));
        }
        assert!(matches!(
            CompactSnapshot::from_value(json!({"alias": {}, "permissions": 3, "roles": []})),
            Err(AuthzError::Malformed(_))
        ));
    }
}
