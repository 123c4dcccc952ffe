//! Composition root: wires in-memory collaborators and drives two sample
//! orders through their lifecycle, logging every rendered notification.

use std::sync::Arc;

use anyhow::{Context, Result};

use marketplace_catalog::ServiceId;
use marketplace_core::{AggregateId, Role, UserId};
use marketplace_events::{EventBus, EventEnvelope, InMemoryEventBus};
use marketplace_infra::{
    InMemoryEventStore, InMemoryServiceCatalog, LifecycleOutcome, MarketplaceConfig,
    OrderLifecycle, PlaceOrderRequest,
};
use marketplace_notifications::LoggingSender;

const BUNDLED_LISTINGS: &str = include_str!("../listings.json");
const BRANDING_SERVICE: &str = "0190f5a2-7c1e-7a3b-9d4e-2f6a8b1c3d5e";
const COPYWRITING_SERVICE: &str = "0190f5a2-7c1e-7a3b-9d4e-2f6a8b1c3d5f";

fn main() -> Result<()> {
    marketplace_observability::init();

    let config = MarketplaceConfig::from_env().context("invalid marketplace configuration")?;
    tracing::info!(locale = %config.locale, base_url = %config.base_url, "starting marketplace core");

    let listings = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("reading listings from {path}"))?,
        None => BUNDLED_LISTINGS.to_string(),
    };
    let listings: serde_json::Value = serde_json::from_str(&listings).context("parsing listings")?;

    let catalog = Arc::new(InMemoryServiceCatalog::new().with_default_currency(&config.currency));
    let loaded = catalog.load_documents(&listings).context("loading listings")?;
    tracing::info!(loaded, "service catalog ready");

    let bus: Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>> = Arc::new(InMemoryEventBus::new());
    let audit = bus.subscribe();
    let lifecycle = OrderLifecycle::new(InMemoryEventStore::new(), bus, catalog, LoggingSender, &config);

    let branding = ServiceId::new(BRANDING_SERVICE.parse::<AggregateId>()?);
    let copywriting = ServiceId::new(COPYWRITING_SERVICE.parse::<AggregateId>()?);

    // Order 1: delivered, revised once, accepted.
    let placed = lifecycle.place_order(PlaceOrderRequest {
        buyer: UserId::new(),
        service_id: branding,
        package: None,
        requirements: vec!["Company name: Northwind".to_string(), "Prefer green tones".to_string()],
        notes: Some("Launch is next month".to_string()),
    })?;
    report("placed", &placed);

    let id = placed.order.id_typed();
    report("payment verified", &lifecycle.verify_payment(id)?);
    report("work started", &lifecycle.start_work(id)?);
    report("delivered", &lifecycle.submit_delivery(id, Some("First draft attached"))?);
    report("revision requested", &lifecycle.request_revision(id, Some("Try a darker green"))?);
    report("redelivered", &lifecycle.submit_delivery(id, Some("Updated palette attached"))?);
    report("accepted", &lifecycle.accept_delivery(id)?);

    // Order 2: cancelled before payment was verified.
    let second = lifecycle.place_order(PlaceOrderRequest {
        buyer: UserId::new(),
        service_id: copywriting,
        package: Some("Express".to_string()),
        requirements: vec!["Five product pages".to_string()],
        notes: None,
    })?;
    report("placed", &second);
    report(
        "cancelled",
        &lifecycle.cancel(second.order.id_typed(), Role::Client, Some("Ordered by mistake"))?,
    );

    // A late transition on a closed order is refused.
    if let Err(err) = lifecycle.start_work(second.order.id_typed()) {
        tracing::info!(error = %err, conflict = err.is_conflict(), "late transition refused");
    }

    let retry = lifecycle.retry_deliveries();
    tracing::info!(
        published = audit.drain().len(),
        pending_deliveries = lifecycle.outbox().pending().len(),
        retried = retry.delivered,
        "scripted run finished"
    );

    Ok(())
}

fn report(step: &str, outcome: &LifecycleOutcome) {
    let order = &outcome.order;
    tracing::info!(
        step,
        order_number = %order.order_number().map(ToString::to_string).unwrap_or_default(),
        status = %order.status(),
        total = order.total().map(|m| m.amount()).unwrap_or_default(),
        notifications = outcome.notifications.len(),
        queued = outcome.queued,
        "order updated"
    );
}
