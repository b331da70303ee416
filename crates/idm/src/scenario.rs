//! 参考数据集
//!
//! Realm `AMS`：柏林的四个组、两个角色以及三个资源上的授予。
//! 命令行 `seed` 与集成测试都用它。

use partix_common::{AttributedType, Group, Realm, Role};
use tracing::{info, warn};

use crate::error::IdmResult;
use crate::partition::PartitionManager;

pub const REALM_NAME: &str = "AMS";

/// 写入参考数据集并返回创建的 Realm
///
/// 中途失败时删除已创建的 `AMS`，不留下半成品。
///
/// # Errors
/// `AMS` 已存在时返回 `DuplicateRealm`
pub async fn seed_reference_realm(manager: &PartitionManager) -> IdmResult<Realm> {
    let realm = manager
        .create_realm(
            Realm::new(REALM_NAME).with_attribute("realmAttributeName", "realmAttributeValue"),
        )
        .await?;

    if let Err(e) = populate(manager, &realm).await {
        warn!(realm = REALM_NAME, error = %e, "Seeding failed, removing partial realm");
        if let Err(rollback) = manager.remove_realm(REALM_NAME).await {
            warn!(realm = REALM_NAME, error = %rollback, "Failed to remove partial realm");
        }
        return Err(e);
    }

    info!(realm = REALM_NAME, "Reference realm seeded");
    Ok(realm)
}

async fn populate(manager: &PartitionManager, realm: &Realm) -> IdmResult<()> {
    let identities = manager.identity_manager(realm);
    let permissions = manager.permission_manager(realm);

    let berlin = Group::new("Berlin");
    identities.add(&berlin).await?;

    let mut children = Vec::new();
    for (name, attribute) in [
        ("ZVB", "groupBerlinZvb"),
        ("Mitte", "groupBerlinMitte"),
        ("Pankow", "groupBerlinPankow"),
    ] {
        let mut group = Group::with_parent(name, &berlin);
        group.set_attribute(
            format!("{attribute}AttributeName"),
            format!("{attribute}AttributeValue"),
        );
        identities.add(&group).await?;
        children.push(group);
    }

    let mut sachbearbeiter = Role::new("Sachbearbeiter");
    sachbearbeiter.set_attribute(
        "roleSachbearbeiterAttributeName",
        "roleSachbearbeiterAttributeValue",
    );
    identities.add(&sachbearbeiter).await?;

    let mut beteiligter = Role::new("Beteiligter");
    beteiligter.set_attribute(
        "roleBeteiligterAttributeName",
        "roleBeteiligterAttributeValue",
    );
    identities.add(&beteiligter).await?;

    permissions.grant(&berlin, "Stammdaten", "read").await?;
    permissions
        .grant(&children[0], "Stammdaten", "create,read,update,delete")
        .await?;
    permissions
        .grant(&sachbearbeiter, "Meldung", "read,update")
        .await?;
    permissions
        .grant(&sachbearbeiter, "Anliegen", "create,read,update")
        .await?;
    permissions.grant(&beteiligter, "Anliegen", "read").await?;
    Ok(())
}
