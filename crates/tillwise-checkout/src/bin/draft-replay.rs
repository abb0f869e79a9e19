//! # Draft Replay
//!
//! Replays a list of edits against a draft order offline and prints the
//! resulting totals. Handy for reproducing a customer's checkout from logs.
//!
//! ## Usage
//! ```bash
//! cargo run -p tillwise-checkout --bin draft-replay -- --input checkout.json
//!
//! # Discount codes from a specific config file
//! cargo run -p tillwise-checkout --bin draft-replay -- -i checkout.json -c ./checkout.toml
//! ```
//!
//! ## Input Format
//! ```json
//! {
//!   "cart": {
//!     "store_id": "store-001",
//!     "payment_intent_id": "pi_123",
//!     "line_items": [{ "sku": "TEE", "name": "Tee", "unit_price": 2500, "quantity": 2 }]
//!   },
//!   "edits": [
//!     { "op": "apply_discount", "code": "SPRING10" },
//!     { "op": "attach_gift_card", "id": "gc_1", "code": "HOLIDAY", "amount_available": 1000 },
//!     { "op": "apply_gift_card", "card_id": "gc_1", "requested": 0, "use_full_amount": true },
//!     { "op": "add_tip", "tip": 300 }
//!   ]
//! }
//! ```
//! `"order"` (a full draft order snapshot) may be given instead of `"cart"`.
//! Rejected edits are reported and leave the order unchanged; replay continues.

use std::env;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tillwise_checkout::{init_tracing, CheckoutError, EngineConfig};
use tillwise_core::{DraftOrder, DraftTotals, GiftCardAllocation, LineItem, Money, TotalChange};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Start {
    Order(Box<DraftOrder>),
    Cart {
        store_id: String,
        payment_intent_id: String,
        line_items: Vec<LineItem>,
    },
}

#[derive(Debug, Deserialize)]
struct ReplayInput {
    #[serde(flatten)]
    start: Start,
    #[serde(default)]
    edits: Vec<Edit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Edit {
    ApplyDiscount { code: String },
    RemoveDiscount,
    AddTip { tip: Money },
    RemoveTip,
    AttachGiftCard {
        id: String,
        code: String,
        amount_available: Money,
        #[serde(default)]
        message: Option<String>,
    },
    ApplyGiftCard {
        card_id: String,
        requested: Money,
        #[serde(default)]
        use_full_amount: bool,
    },
    RemoveGiftCard { card_id: String },
}

#[derive(Debug, Serialize)]
struct StepReport {
    edit: Edit,
    #[serde(skip_serializing_if = "Option::is_none")]
    change: Option<TotalChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReplayReport {
    order_id: String,
    pricing_version: u64,
    steps: Vec<StepReport>,
    totals: DraftTotals,
    gift_cards: Vec<GiftCardAllocation>,
}

fn apply(order: &mut DraftOrder, edit: &Edit, config: &EngineConfig) -> Result<TotalChange, CheckoutError> {
    let snapshot = config.pricing_snapshot();
    let change = match edit {
        Edit::ApplyDiscount { code } => order.apply_discount(code, &snapshot, Utc::now())?,
        Edit::RemoveDiscount => order.remove_discount()?,
        Edit::AddTip { tip } => order.add_tip(*tip)?,
        Edit::RemoveTip => order.remove_tip()?,
        Edit::AttachGiftCard {
            id,
            code,
            amount_available,
            message,
        } => {
            order.attach_gift_card(id, code, *amount_available, message.clone())?;
            TotalChange::unchanged(order.total)
        }
        Edit::ApplyGiftCard {
            card_id,
            requested,
            use_full_amount,
        } => order.apply_gift_card(card_id, *requested, *use_full_amount)?,
        Edit::RemoveGiftCard { card_id } => order.remove_gift_card(card_id)?,
    };
    Ok(change)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(Some("warn,tillwise=info,draft_replay=info"));

    let args: Vec<String> = env::args().collect();
    let mut input_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" | "-i" => {
                if i + 1 < args.len() {
                    input_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tillwise Draft Replay");
                println!();
                println!("Usage: draft-replay --input <FILE> [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -i, --input <FILE>   Replay file (draft order or cart + edits)");
                println!("  -c, --config <PATH>  checkout.toml with the discount table");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let input_path = input_path.ok_or("missing --input <FILE> (see --help)")?;
    let config = match config_path {
        Some(path) => EngineConfig::load(Some(path))?,
        None => EngineConfig::load_or_default(None),
    };

    let contents = std::fs::read_to_string(&input_path).map_err(CheckoutError::Io)?;
    let input: ReplayInput = serde_json::from_str(&contents)?;

    let mut order = match input.start {
        Start::Order(order) => *order,
        Start::Cart {
            store_id,
            payment_intent_id,
            line_items,
        } => DraftOrder::from_line_items(store_id, line_items, payment_intent_id),
    };
    order.check_invariants()?;

    let mut steps = Vec::with_capacity(input.edits.len());
    for edit in input.edits {
        match apply(&mut order, &edit, &config) {
            Ok(change) => {
                info!(
                    edit = ?edit,
                    previous = %change.previous,
                    current = %change.current,
                    "Edit applied"
                );
                steps.push(StepReport {
                    edit,
                    change: Some(change),
                    error: None,
                });
            }
            Err(err) => {
                warn!(edit = ?edit, error = %err, "Edit rejected");
                steps.push(StepReport {
                    edit,
                    change: None,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    let report = ReplayReport {
        order_id: order.id.clone(),
        pricing_version: config.discounts.version,
        steps,
        totals: order.totals(),
        gift_cards: order.gift_cards.clone(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
