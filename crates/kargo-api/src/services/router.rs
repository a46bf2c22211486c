//! Tenant router
//!
//! Assigns every inbound event to exactly one agency and one group, and
//! auto-provisions groups the first time a channel is seen. Provisioning
//! is idempotent: the unique constraint on the external id breaks races.

use kargo_core::errors::CoreResult;
use kargo_db::repositories::{AgencyRepository, GroupRepository};
use kargo_db::StorageAdapter;
use kargo_whatsapp::InboundEvent;
use std::sync::Arc;
use tracing::{info, warn};

/// Routing decision for one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    Accepted { agency_id: i64, group_id: i64 },
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Direct messages and the bot's own echoes carry no deliveries.
    NotAGroup,
    FromSelf,
    /// `GROUP_ID` is configured and this is a different channel.
    GroupNotAllowed,
    /// Known group, deactivated: accepted on the wire, no deliveries.
    InactiveGroup,
    /// No active agency exists to own an unknown group.
    NoTenantAvailable,
}

pub struct TenantRouter {
    adapter: Arc<StorageAdapter>,
    default_agency_id: Option<i64>,
    allowed_group: Option<String>,
}

impl TenantRouter {
    pub fn new(
        adapter: Arc<StorageAdapter>,
        default_agency_id: Option<i64>,
        allowed_group: Option<String>,
    ) -> Self {
        Self {
            adapter,
            default_agency_id,
            allowed_group,
        }
    }

    pub async fn route(&self, event: &InboundEvent) -> CoreResult<Routed> {
        if !event.is_group {
            return Ok(Routed::Rejected(RejectReason::NotAGroup));
        }
        if event.from_self {
            return Ok(Routed::Rejected(RejectReason::FromSelf));
        }

        let external_id = match event.external_group_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => return Ok(Routed::Rejected(RejectReason::NotAGroup)),
        };

        if let Some(allowed) = &self.allowed_group {
            if allowed != external_id {
                return Ok(Routed::Rejected(RejectReason::GroupNotAllowed));
            }
        }

        let groups = GroupRepository::new(&self.adapter);
        if let Some(group) = groups.find_by_external_id(external_id).await? {
            if !group.is_active {
                return Ok(Routed::Rejected(RejectReason::InactiveGroup));
            }
            return Ok(Routed::Accepted {
                agency_id: group.agency_id,
                group_id: group.id,
            });
        }

        // Unknown channel: pick a tenant and provision.
        let agencies = AgencyRepository::new(&self.adapter);
        let agency_id = match agencies
            .pick_provision_tenant(self.default_agency_id)
            .await?
        {
            Some(agency_id) => agency_id,
            None => {
                warn!(external_id, "no active agency available for provisioning");
                return Ok(Routed::Rejected(RejectReason::NoTenantAvailable));
            }
        };

        let name = event
            .group_display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(external_id);
        let group = groups.provision(agency_id, external_id, name).await?;
        info!(
            group_id = group.id,
            agency_id, external_id, "auto-provisioned group"
        );

        Ok(Routed::Accepted {
            agency_id: group.agency_id,
            group_id: group.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kargo_core::auth::TenantScope;
    use kargo_core::entities::agency::AgencyRole;
    use kargo_db::repositories::NewAgency;
    use kargo_db::DbConfig;

    async fn adapter_with_agency() -> (Arc<StorageAdapter>, i64) {
        let mut config = DbConfig::sqlite("ignored");
        config.url = "sqlite::memory:".to_string();
        config.max_connections = 1;
        let adapter = Arc::new(StorageAdapter::connect(&config).await.unwrap());
        kargo_db::schema::create_schema(&adapter).await.unwrap();

        let agency = AgencyRepository::new(&adapter)
            .create(NewAgency {
                name: "Express Douala".to_string(),
                email: "a@b.cm".to_string(),
                password_hash: "hash".to_string(),
                role: AgencyRole::Agency,
                code: None,
                address: None,
                phone: None,
            })
            .await
            .unwrap();
        (adapter, agency.id)
    }

    fn event(group: Option<&str>, is_group: bool, from_self: bool) -> InboundEvent {
        InboundEvent {
            body: "612345678\n2 robes\n15k\nBonapriso".to_string(),
            external_message_id: "wamid.1".to_string(),
            external_group_id: group.map(str::to_string),
            group_display_name: Some("Livraisons".to_string()),
            is_group,
            from_self,
            quoted_external_message_id: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_rejects_direct_and_self_messages() {
        let (adapter, _) = adapter_with_agency().await;
        let router = TenantRouter::new(adapter, None, None);

        assert_eq!(
            router.route(&event(None, false, false)).await.unwrap(),
            Routed::Rejected(RejectReason::NotAGroup)
        );
        assert_eq!(
            router.route(&event(Some("g@g.us"), true, true)).await.unwrap(),
            Routed::Rejected(RejectReason::FromSelf)
        );
    }

    #[tokio::test]
    async fn test_auto_provisions_unknown_group() {
        let (adapter, agency_id) = adapter_with_agency().await;
        let router = TenantRouter::new(adapter.clone(), None, None);

        match router.route(&event(Some("g@g.us"), true, false)).await.unwrap() {
            Routed::Accepted { agency_id: routed, group_id } => {
                assert_eq!(routed, agency_id);
                let group = GroupRepository::new(&adapter)
                    .find_scoped(TenantScope::Unrestricted, group_id)
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(group.name, "Livraisons");
            }
            other => panic!("expected accepted, got {:?}", other),
        }

        // Second event reuses the provisioned row.
        let second = router.route(&event(Some("g@g.us"), true, false)).await.unwrap();
        assert!(matches!(second, Routed::Accepted { .. }));
        assert_eq!(
            GroupRepository::new(&adapter)
                .list(TenantScope::Unrestricted)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_inactive_group_is_rejected() {
        let (adapter, agency_id) = adapter_with_agency().await;
        let groups = GroupRepository::new(&adapter);
        let group = groups.provision(agency_id, "g@g.us", "Groupe").await.unwrap();
        groups
            .soft_delete(TenantScope::Unrestricted, group.id)
            .await
            .unwrap();

        let router = TenantRouter::new(adapter, None, None);
        assert_eq!(
            router.route(&event(Some("g@g.us"), true, false)).await.unwrap(),
            Routed::Rejected(RejectReason::InactiveGroup)
        );
    }

    #[tokio::test]
    async fn test_group_allow_list() {
        let (adapter, _) = adapter_with_agency().await;
        let router = TenantRouter::new(adapter, None, Some("only@g.us".to_string()));

        assert_eq!(
            router.route(&event(Some("other@g.us"), true, false)).await.unwrap(),
            Routed::Rejected(RejectReason::GroupNotAllowed)
        );
        assert!(matches!(
            router.route(&event(Some("only@g.us"), true, false)).await.unwrap(),
            Routed::Accepted { .. }
        ));
    }

    #[tokio::test]
    async fn test_no_tenant_available() {
        let mut config = DbConfig::sqlite("ignored");
        config.url = "sqlite::memory:".to_string();
        config.max_connections = 1;
        let adapter = Arc::new(StorageAdapter::connect(&config).await.unwrap());
        kargo_db::schema::create_schema(&adapter).await.unwrap();

        let router = TenantRouter::new(adapter, None, None);
        assert_eq!(
            router.route(&event(Some("g@g.us"), true, false)).await.unwrap(),
            Routed::Rejected(RejectReason::NoTenantAvailable)
        );
    }
}
