//! Realm 内容的文本输出

use partix_common::{AttributedType, Attributes, IdentityType, RealmState};

pub fn describe(state: &RealmState) -> String {
    let mut out = String::new();

    out.push_str("=== REALM ===\n");
    out.push_str(&format!("Realm: name={}\n", state.realm.name()));
    write_attributes(&mut out, state.realm.attributes());
    out.push('\n');

    out.push_str("=== GROUPS ===\n");
    for group in &state.groups {
        out.push_str(&format!("Group: name={}, path={}\n", group.name(), group.path()));
        write_attributes(&mut out, group.attributes());
    }
    out.push('\n');

    out.push_str("=== ROLES ===\n");
    for role in &state.roles {
        out.push_str(&format!("Role: name={}\n", role.name()));
        write_attributes(&mut out, role.attributes());
    }
    out.push('\n');

    if !state.users.is_empty() {
        out.push_str("=== USERS ===\n");
        for user in &state.users {
            out.push_str(&format!("User: loginName={}\n", user.login_name()));
            write_attributes(&mut out, user.attributes());
        }
        out.push('\n');
    }

    if !state.permissions.is_empty() {
        out.push_str("=== PERMISSIONS ===\n");
        for p in &state.permissions {
            let assignee = state.identity_name(p.assignee).unwrap_or("?");
            out.push_str(&format!(
                "Permission: assignee={} {}, resource={}, operation={}\n",
                p.assignee.kind, assignee, p.resource, p.operation
            ));
        }
        out.push('\n');
    }

    out
}

fn write_attributes(out: &mut String, attributes: &Attributes) {
    for (name, value) in attributes.iter() {
        out.push_str(&format!("  {name}={value}\n"));
    }
}
