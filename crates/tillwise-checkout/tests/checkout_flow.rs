//! End-to-end checkout flows against in-memory providers.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use tillwise_checkout::config::DiscountCodeConfig;
use tillwise_checkout::providers::NoLimit;
use tillwise_checkout::{
    AlertSink, CheckoutError, CheckoutSession, CostEstimateProvider, EngineConfig, MarginAlert,
    PaymentIntentSynchronizer, ProviderError, Providers, ShippingQuoteProvider, TaxRateProvider,
    TaxRateSource,
};
use tillwise_core::{
    Address, Contact, CoreError, CostEstimate, DraftOrder, LineItem, MarginVerdict, Money,
    ShippingRate,
};

// =============================================================================
// Fake Providers
// =============================================================================

#[derive(Default)]
struct RecordingPayments {
    updates: Mutex<Vec<(String, Money)>>,
    failing: AtomicBool,
}

impl RecordingPayments {
    async fn amounts(&self) -> Vec<i64> {
        self.updates.lock().await.iter().map(|(_, m)| m.cents()).collect()
    }
}

#[async_trait]
impl PaymentIntentSynchronizer for RecordingPayments {
    async fn update_authorized_amount(
        &self,
        intent_id: &str,
        new_total: Money,
    ) -> Result<(), ProviderError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::new("card processor returned 503"));
        }
        self.updates.lock().await.push((intent_id.to_string(), new_total));
        Ok(())
    }
}

struct ScriptedTax(Mutex<Result<f64, String>>);

#[async_trait]
impl TaxRateProvider for ScriptedTax {
    async fn lookup_rate(&self, _address: &Address) -> Result<f64, ProviderError> {
        self.0.lock().await.clone().map_err(ProviderError::new)
    }
}

struct CountingShipping {
    calls: AtomicUsize,
}

#[async_trait]
impl ShippingQuoteProvider for CountingShipping {
    async fn list_rates(
        &self,
        _address: &Address,
        _line_items: &[LineItem],
    ) -> Result<Vec<ShippingRate>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![ShippingRate {
            id: "ground".into(),
            name: "Ground".into(),
            rate: Money::from_cents(500),
            min_delivery_days: Some(3),
            max_delivery_days: Some(5),
        }])
    }
}

struct FixedEstimate {
    calls: AtomicUsize,
    estimate: CostEstimate,
}

#[async_trait]
impl CostEstimateProvider for FixedEstimate {
    async fn estimate(
        &self,
        _address: &Address,
        _method: &str,
        _line_items: &[LineItem],
    ) -> Result<CostEstimate, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.estimate.clone())
    }
}

#[derive(Default)]
struct RecordingAlerts(Mutex<Vec<MarginAlert>>);

#[async_trait]
impl AlertSink for RecordingAlerts {
    async fn notify_margin_alert(&self, alert: MarginAlert) -> Result<(), ProviderError> {
        self.0.lock().await.push(alert);
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    payments: Arc<RecordingPayments>,
    tax: Arc<ScriptedTax>,
    shipping: Arc<CountingShipping>,
    estimates: Arc<FixedEstimate>,
    alerts: Arc<RecordingAlerts>,
}

impl Harness {
    fn new() -> Self {
        Harness {
            payments: Arc::new(RecordingPayments::default()),
            tax: Arc::new(ScriptedTax(Mutex::new(Ok(0.08)))),
            shipping: Arc::new(CountingShipping {
                calls: AtomicUsize::new(0),
            }),
            estimates: Arc::new(FixedEstimate {
                calls: AtomicUsize::new(0),
                estimate: CostEstimate {
                    subtotal: Decimal::from_str("80.00").unwrap(),
                    shipping: Decimal::from_str("5.00").unwrap(),
                    tax: Decimal::from_str("6.50").unwrap(),
                    total: Decimal::from_str("90.00").unwrap(),
                },
            }),
            alerts: Arc::new(RecordingAlerts::default()),
        }
    }

    fn providers(&self) -> Providers {
        Providers {
            payments: self.payments.clone(),
            tax: self.tax.clone(),
            shipping: self.shipping.clone(),
            estimates: self.estimates.clone(),
            rate_limiter: Arc::new(NoLimit),
            alerts: self.alerts.clone(),
        }
    }

    fn session(&self, order: DraftOrder) -> CheckoutSession {
        CheckoutSession::new(order, self.providers(), Arc::new(config()))
    }
}

fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.discounts.version = 7;
    config.discounts.codes.insert(
        "SPRING10".into(),
        DiscountCodeConfig {
            percent_bps: 1000,
            min_subtotal_cents: None,
            expires_at: None,
        },
    );
    config.discounts.codes.insert(
        "CLEARANCE70".into(),
        DiscountCodeConfig {
            percent_bps: 7000,
            min_subtotal_cents: None,
            expires_at: None,
        },
    );
    config.tax.postal_fallbacks.insert("94105".into(), 863);
    config
}

fn order_of(cents: i64) -> DraftOrder {
    DraftOrder::from_line_items(
        "store-1",
        vec![LineItem::new("ITEM", "Item", Money::from_cents(cents), 1)],
        "pi_flow",
    )
}

fn california() -> Contact {
    Contact {
        name: "Grace".into(),
        email: "grace@example.com".into(),
        address: Address {
            line1: "1 Market St".into(),
            line2: None,
            city: "San Francisco".into(),
            state: "CA".into(),
            postal_code: "94105".into(),
            country: "US".into(),
        },
    }
}

fn oregon() -> Address {
    Address {
        line1: "9 Pine St".into(),
        line2: None,
        city: "Portland".into(),
        state: "OR".into(),
        postal_code: "97204".into(),
        country: "US".into(),
    }
}

fn charges(session: &CheckoutSession) -> Vec<i64> {
    session
        .order()
        .gift_cards
        .iter()
        .map(|card| card.charged.cents())
        .collect()
}

// =============================================================================
// Flows
// =============================================================================

#[tokio::test]
async fn test_discount_after_shipping_and_ca_tax() {
    let harness = Harness::new();
    let mut session = harness.session(order_of(10_000));
    let contact = california();

    session
        .refresh_shipping_rates(&contact.address, "ground")
        .await
        .unwrap();
    let (resolution, _) = session.update_contact(&contact).await.unwrap();
    assert_eq!(resolution.source, TaxRateSource::Live);
    assert_eq!(session.order().tax.cents(), 800);
    assert_eq!(session.order().total.cents(), 11_300);

    let change = session.apply_discount("spring10").await.unwrap();

    let order = session.order();
    assert_eq!(change.previous.cents(), 11_300);
    assert_eq!(order.post_discount_total.cents(), 9000);
    assert_eq!(order.tax.cents(), 720);
    assert_eq!(order.total.cents(), 10_220);
    assert!(order.check_invariants().is_ok());
    assert_eq!(harness.payments.amounts().await, vec![10_500, 11_300, 10_220]);

    // re-applying the same code moves nothing and is not synced
    let again = session.apply_discount("SPRING10").await.unwrap();
    assert!(!again.changed());
    assert_eq!(harness.payments.amounts().await.len(), 3);
    assert_eq!(session.pricing_snapshot().version, 7);
}

#[tokio::test]
async fn test_over_allocation_shrinks_partial_card_when_tip_removed() {
    let harness = Harness::new();
    let mut session = harness.session(order_of(1000));

    session.add_tip(Money::from_cents(300)).await.unwrap();
    session
        .attach_gift_card("gc1", "HOLIDAY", Money::from_cents(800), None)
        .unwrap();
    session
        .attach_gift_card("gc2", "BIRTHDAY", Money::from_cents(500), None)
        .unwrap();
    session
        .apply_gift_card("gc1", Money::from_cents(800), false)
        .await
        .unwrap();
    session
        .apply_gift_card("gc2", Money::zero(), true)
        .await
        .unwrap();
    assert_eq!(session.order().total.cents(), 0);

    let change = session.remove_tip().await.unwrap();

    assert!(!change.changed());
    assert_eq!(charges(&session), vec![500, 500]);
    assert_eq!(session.order().gift_card_sum.cents(), 1000);
    assert_eq!(harness.payments.amounts().await, vec![1300, 500, 0]);
}

#[tokio::test]
async fn test_full_amount_card_keeps_minimum_remainder() {
    let harness = Harness::new();
    let mut session = harness.session(order_of(1020));

    session
        .attach_gift_card("gc1", "BIRTHDAY", Money::from_cents(1000), None)
        .unwrap();
    let change = session
        .apply_gift_card("gc1", Money::zero(), true)
        .await
        .unwrap();

    assert_eq!(charges(&session), vec![970]);
    assert_eq!(change.current.cents(), 50);
    assert_eq!(harness.payments.amounts().await, vec![50]);
}

#[tokio::test]
async fn test_unsatisfiable_edit_changes_nothing() {
    let harness = Harness::new();
    let mut session = harness.session(order_of(100));
    session
        .attach_gift_card("gc1", "HOLIDAY", Money::from_cents(1000), None)
        .unwrap();
    session
        .apply_gift_card("gc1", Money::from_cents(10), false)
        .await
        .unwrap();
    let before = session.totals();
    assert_eq!(before.total_cents, 90);

    // 70% off leaves 20 to pay, and only 10 can be released to reach 50
    let err = session.apply_discount("CLEARANCE70").await.unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Core(CoreError::ConstraintUnsatisfiable { .. })
    ));
    assert_eq!(session.totals(), before);
    assert!(session.order().order_discount.is_none());
    assert_eq!(charges(&session), vec![10]);
    assert_eq!(harness.payments.amounts().await, vec![90]);
}

#[tokio::test]
async fn test_gift_card_rejected_on_small_order() {
    let harness = Harness::new();
    let mut session = harness.session(order_of(40));

    let err = session
        .attach_gift_card("gc1", "HOLIDAY", Money::from_cents(1000), None)
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Core(CoreError::ConstraintUnsatisfiable { .. })
    ));
    assert!(session.order().gift_cards.is_empty());

    session.add_tip(Money::from_cents(5)).await.unwrap();
    assert_eq!(harness.payments.amounts().await, vec![45]);
}

#[tokio::test]
async fn test_payment_failure_is_divergence_and_order_keeps_edit() {
    let harness = Harness::new();
    let mut session = harness.session(order_of(2000));
    harness.payments.failing.store(true, Ordering::SeqCst);

    let err = session.add_tip(Money::from_cents(300)).await.unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::SyncDivergence { ref intent_id, .. } if intent_id == "pi_flow"
    ));
    assert!(err.is_retryable());
    assert_eq!(session.order().tip.cents(), 300);
    assert_eq!(session.order().total.cents(), 2300);

    harness.payments.failing.store(false, Ordering::SeqCst);
    session.resync_payment_intent().await.unwrap();

    let updates = harness.payments.updates.lock().await;
    assert_eq!(updates.as_slice(), &[("pi_flow".to_string(), Money::from_cents(2300))]);
}

#[tokio::test]
async fn test_tax_lookup_failure_uses_postal_fallback() {
    let harness = Harness::new();
    *harness.tax.0.lock().await = Err("rate service down".into());
    let mut session = harness.session(order_of(10_000));

    let (resolution, change) = session.update_contact(&california()).await.unwrap();

    assert!(resolution.ca_tax);
    assert_eq!(resolution.source, TaxRateSource::PostalFallback);
    assert_eq!(resolution.rate.bps(), 863);
    assert!(resolution.lookup_error.is_some());
    assert_eq!(session.order().tax.cents(), 863);
    assert_eq!(change.current.cents(), 10_863);
}

#[tokio::test]
async fn test_tax_fallback_prefers_rate_seen_this_session() {
    let harness = Harness::new();
    let mut session = harness.session(order_of(10_000));

    session.update_contact(&california()).await.unwrap();
    *harness.tax.0.lock().await = Err("timeout".into());
    let (resolution, _) = session.update_contact(&california()).await.unwrap();

    assert_eq!(resolution.source, TaxRateSource::SessionCache);
    assert_eq!(resolution.rate.bps(), 800);
}

#[tokio::test]
async fn test_out_of_state_contact_leaves_totals() {
    let harness = Harness::new();
    let mut session = harness.session(order_of(10_000));
    let contact = Contact {
        address: oregon(),
        ..california()
    };

    let (resolution, change) = session.update_contact(&contact).await.unwrap();

    assert!(!resolution.ca_tax);
    assert_eq!(resolution.source, TaxRateSource::NotApplicable);
    assert!(!change.changed());
    assert!(!session.order().ca_tax);
    assert!(harness.payments.amounts().await.is_empty());
}

#[tokio::test]
async fn test_shipping_quotes_expire_after_ttl() {
    let harness = Harness::new();
    let t0 = Utc.with_ymd_and_hms(2024, 11, 29, 8, 0, 0).unwrap();
    let now = Arc::new(std::sync::Mutex::new(t0));
    let clock_now = now.clone();
    let mut session = harness
        .session(order_of(4000))
        .with_clock(Arc::new(move || -> DateTime<Utc> { *clock_now.lock().unwrap() }));

    session.refresh_shipping_rates(&oregon(), "ground").await.unwrap();
    *now.lock().unwrap() = t0 + ChronoDuration::minutes(59);
    session.refresh_shipping_rates(&oregon(), "Ground").await.unwrap();
    assert_eq!(harness.shipping.calls.load(Ordering::SeqCst), 1);

    *now.lock().unwrap() = t0 + ChronoDuration::minutes(61);
    session.refresh_shipping_rates(&oregon(), "ground").await.unwrap();
    assert_eq!(harness.shipping.calls.load(Ordering::SeqCst), 2);

    assert_eq!(session.order().shipping.cents(), 500);
    assert_eq!(session.order().updated_at, t0 + ChronoDuration::minutes(61));
    assert_eq!(harness.payments.amounts().await, vec![4500]);
}

#[tokio::test]
async fn test_estimate_near_price_raises_warning() {
    let harness = Harness::new();
    let mut session = harness.session(order_of(10_000));

    let outcome = session
        .refresh_cost_estimate(&oregon(), "ground", "198.51.100.4")
        .await
        .unwrap();

    // price 10650 (estimated tax applied), estimate 9000
    assert_eq!(session.order().tax.cents(), 650);
    assert_eq!(outcome.margin.price.cents(), 10_650);
    assert_eq!(outcome.margin.verdict, MarginVerdict::Warning);
    outcome.alert.expect("warning dispatches an alert").wait().await;

    let alerts = harness.alerts.0.lock().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].order_id, session.order().id);
    assert_eq!(alerts[0].verdict, MarginVerdict::Warning);
    drop(alerts);

    let second = session
        .refresh_cost_estimate(&oregon(), "ground", "198.51.100.4")
        .await
        .unwrap();
    assert!(!second.change.changed());
    assert_eq!(harness.estimates.calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.payments.amounts().await, vec![10_650]);
}
