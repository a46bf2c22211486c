//! Ingestion pipeline
//!
//! Parser → router → store write, one event at a time per group. Parser
//! outcomes never become HTTP errors: noise is dropped, unresolvable
//! updates only log and, when confirmations are on, prompt the group for
//! clarification.

use crate::config::IngestionConfig;
use crate::services::resolver::{self, ResolveOutcome};
use crate::services::router::{RejectReason, Routed, TenantRouter};
use crate::workers::dispatcher::EventHandler;
use async_trait::async_trait;
use kargo_core::entities::delivery::{Delivery, DeliveryStatus};
use kargo_core::entities::history::HistoryEntry;
use kargo_core::errors::CoreResult;
use kargo_core::parser::{classify, CreateDelivery, ParsedMessage, ParserConfig};
use kargo_core::transitions::FeePolicy;
use kargo_db::repositories::{DeliveryDraft, DeliveryRepository};
use kargo_db::StorageAdapter;
use kargo_whatsapp::{BridgeClient, InboundEvent, OutboundMessage};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct IngestionService {
    adapter: Arc<StorageAdapter>,
    router: TenantRouter,
    parser_config: ParserConfig,
    fee_policy: FeePolicy,
    bridge: Option<Arc<BridgeClient>>,
    send_confirmations: bool,
}

impl IngestionService {
    pub fn new(
        adapter: Arc<StorageAdapter>,
        parser_config: ParserConfig,
        fee_policy: FeePolicy,
        ingestion: IngestionConfig,
        bridge: Option<Arc<BridgeClient>>,
    ) -> Self {
        let router = TenantRouter::new(
            adapter.clone(),
            ingestion.default_agency_id,
            ingestion.allowed_group.clone(),
        );
        Self {
            adapter,
            router,
            parser_config,
            fee_policy,
            bridge,
            send_confirmations: ingestion.send_confirmations,
        }
    }

    async fn process(&self, event: InboundEvent) -> CoreResult<()> {
        let (agency_id, group_id) = match self.router.route(&event).await? {
            Routed::Accepted {
                agency_id,
                group_id,
            } => (agency_id, group_id),
            Routed::Rejected(reason) => {
                if reason == RejectReason::NoTenantAvailable {
                    warn!(?reason, "inbound event dropped");
                } else {
                    debug!(?reason, "inbound event dropped");
                }
                return Ok(());
            }
        };

        match classify(&event.body, &self.parser_config) {
            ParsedMessage::Ignore => Ok(()),
            ParsedMessage::Create(create) => {
                self.handle_create(agency_id, group_id, create, &event).await
            }
            ParsedMessage::Update(update) => {
                let outcome = resolver::apply_update(
                    &self.adapter,
                    &self.fee_policy,
                    agency_id,
                    &update,
                    &event,
                    HistoryEntry::BOT_ACTOR,
                )
                .await?;
                self.confirm_update(&event, outcome).await;
                Ok(())
            }
        }
    }

    async fn handle_create(
        &self,
        agency_id: i64,
        group_id: i64,
        create: CreateDelivery,
        event: &InboundEvent,
    ) -> CoreResult<()> {
        let deliveries = DeliveryRepository::new(&self.adapter);
        // The transport may redeliver; one inbound message is one delivery.
        if let Some(existing) = deliveries
            .find_by_message_id(&event.external_message_id, Some(agency_id))
            .await?
        {
            debug!(delivery_id = existing.id, "duplicate create event ignored");
            return Ok(());
        }

        let mut draft = DeliveryDraft::new(create.phone, create.items, create.amount_due);
        draft.status = DeliveryStatus::Pending;
        draft.quartier = create.quartier;
        draft.carrier = create.carrier;
        draft.agency_id = Some(agency_id);
        draft.group_id = Some(group_id);
        draft.whatsapp_message_id = Some(event.external_message_id.clone());

        let delivery = deliveries.insert(draft, HistoryEntry::BOT_ACTOR).await?;
        info!(
            delivery_id = delivery.id,
            agency_id, group_id, "delivery created from group message"
        );

        self.send(event, create_confirmation(&delivery)).await;
        Ok(())
    }

    async fn confirm_update(&self, event: &InboundEvent, outcome: ResolveOutcome) {
        let text = match outcome {
            ResolveOutcome::Applied(delivery) => update_confirmation(&delivery),
            ResolveOutcome::DuplicatePayment(_) => return,
            ResolveOutcome::TargetUnresolved => {
                "⚠️ Précisez le numéro du client ou répondez au message de la livraison."
                    .to_string()
            }
            ResolveOutcome::TargetMissing => {
                "⚠️ Aucune livraison en cours pour ce numéro.".to_string()
            }
        };
        self.send(event, text).await;
    }

    async fn send(&self, event: &InboundEvent, text: String) {
        if !self.send_confirmations {
            return;
        }
        let (bridge, group) = match (&self.bridge, event.external_group_id.as_deref()) {
            (Some(bridge), Some(group)) => (bridge, group),
            _ => return,
        };
        if let Err(send_error) = bridge.send(&OutboundMessage::new(group, text)).await {
            warn!(%send_error, "confirmation send failed");
        }
    }
}

#[async_trait]
impl EventHandler for IngestionService {
    async fn handle(&self, event: InboundEvent) {
        let message_id = event.external_message_id.clone();
        if let Err(process_error) = self.process(event).await {
            error!(%message_id, %process_error, "event processing failed");
        }
    }
}

fn create_confirmation(delivery: &Delivery) -> String {
    let quartier = delivery
        .quartier
        .as_deref()
        .map(|quartier| format!(" ({})", quartier))
        .unwrap_or_default();
    format!(
        "✅ Livraison #{} enregistrée: {} — {} — {} FCFA{}",
        delivery.id, delivery.phone, delivery.items, delivery.amount_due, quartier
    )
}

fn update_confirmation(delivery: &Delivery) -> String {
    format!(
        "✅ Livraison #{} ({}): statut {}, payé {} FCFA / {} FCFA",
        delivery.id,
        delivery.phone,
        delivery.status.as_str(),
        delivery.amount_paid,
        delivery.amount_due
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kargo_core::auth::TenantScope;
    use kargo_core::entities::agency::AgencyRole;
    use kargo_core::entities::common::PaginationParams;
    use kargo_core::money::Money;
    use kargo_db::repositories::{AgencyRepository, DeliveryFilter, NewAgency, Sort, TariffRepository};
    use kargo_db::DbConfig;

    async fn service() -> (IngestionService, Arc<StorageAdapter>, i64) {
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

        let service = IngestionService::new(
            adapter.clone(),
            ParserConfig::default(),
            FeePolicy::default(),
            IngestionConfig {
                default_agency_id: None,
                allowed_group: None,
                send_confirmations: false,
            },
            None,
        );
        (service, adapter, agency.id)
    }

    fn group_event(body: &str, message_id: &str, quoted: Option<&str>) -> InboundEvent {
        InboundEvent {
            body: body.to_string(),
            external_message_id: message_id.to_string(),
            external_group_id: Some("g@g.us".to_string()),
            group_display_name: Some("Livraisons".to_string()),
            is_group: true,
            from_self: false,
            quoted_external_message_id: quoted.map(str::to_string),
            timestamp: Utc::now(),
        }
    }

    async fn list_all(adapter: &StorageAdapter) -> Vec<Delivery> {
        DeliveryRepository::new(adapter)
            .list(
                TenantScope::Unrestricted,
                &DeliveryFilter::default(),
                PaginationParams::default(),
                Sort::default(),
            )
            .await
            .unwrap()
            .rows
    }

    #[tokio::test]
    async fn test_create_then_quoted_delivered() {
        let (service, adapter, agency_id) = service().await;
        TariffRepository::new(&adapter)
            .upsert(agency_id, "Bonapriso", Money::from_major(1000))
            .await
            .unwrap();

        service
            .process(group_event("612345678\n2 robes\n15k\nBonapriso", "wamid.1", None))
            .await
            .unwrap();

        let rows = list_all(&adapter).await;
        assert_eq!(rows.len(), 1);
        let created = &rows[0];
        assert_eq!(created.phone, "612345678");
        assert_eq!(created.items, "2 robes");
        assert_eq!(created.amount_due, Money::from_major(15_000));
        assert_eq!(created.status, DeliveryStatus::Pending);
        assert_eq!(created.amount_paid, Money::ZERO);
        assert_eq!(created.whatsapp_message_id.as_deref(), Some("wamid.1"));
        assert!(created.agency_id.is_some());
        assert!(created.group_id.is_some());

        // Quoted reply flips it to delivered with the tariff applied.
        service
            .process(group_event("Livré", "wamid.2", Some("wamid.1")))
            .await
            .unwrap();

        let rows = list_all(&adapter).await;
        let updated = &rows[0];
        assert_eq!(updated.status, DeliveryStatus::Delivered);
        assert_eq!(updated.delivery_fee, Money::from_major(1000));
        assert_eq!(updated.amount_paid, Money::from_major(14_000));

        let history = DeliveryRepository::new(&adapter)
            .history(updated.id)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_noise_and_non_group_produce_nothing() {
        let (service, adapter, _) = service().await;

        service
            .process(group_event("bonjour à tous", "wamid.1", None))
            .await
            .unwrap();

        let mut direct = group_event("612345678\n2 robes\n15k\nBonapriso", "wamid.2", None);
        direct.is_group = false;
        service.process(direct).await.unwrap();

        let mut echo = group_event("612345678\n2 robes\n15k\nBonapriso", "wamid.3", None);
        echo.from_self = true;
        service.process(echo).await.unwrap();

        assert!(list_all(&adapter).await.is_empty());
    }

    #[tokio::test]
    async fn test_redelivered_event_converges() {
        let (service, adapter, _) = service().await;

        let event = group_event("612345678\n2 robes\n15k\nBonapriso", "wamid.1", None);
        service.process(event.clone()).await.unwrap();

        // A redelivered create must not produce a second row.
        service.process(event.clone()).await.unwrap();
        assert_eq!(list_all(&adapter).await.len(), 1);

        let update = group_event("Livré", "wamid.2", Some("wamid.1"));
        service.process(update.clone()).await.unwrap();
        let after_first: Vec<_> = list_all(&adapter).await;

        // The transport may redeliver; the row state must not drift.
        service.process(update).await.unwrap();
        let after_second: Vec<_> = list_all(&adapter).await;

        assert_eq!(after_first[0].status, after_second[0].status);
        assert_eq!(after_first[0].amount_paid, after_second[0].amount_paid);
        assert_eq!(after_first[0].delivery_fee, after_second[0].delivery_fee);
    }
}
