use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{is_weekend, GeneratedSlot, PriceRule, SlotConfig};

/// Result of resolving a slot's effective price.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: Decimal,
    pub applied_rule_id: Option<i64>,
}

/// Round-half-up to two decimal places. Applied once, at the final step of
/// a price computation; intermediate sums stay unrounded.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Resolve the effective price for one generated slot on one date.
///
/// At most one rule applies: it must be enabled, in effect on the date, and
/// its window must fully contain the slot. Among matches the winner is the
/// highest priority, then the narrowest window, then the lowest rule id.
/// The weekend multiplier applies on Saturday/Sunday unless the winning
/// rule overrides the base price.
pub fn resolve(
    config: &SlotConfig,
    rules: &[PriceRule],
    slot: &GeneratedSlot,
    date: NaiveDate,
) -> Quote {
    let rule = rules
        .iter()
        .filter(|r| r.enabled && r.applies_on(date) && r.covers(slot.start_time, slot.end_time))
        .min_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.window_minutes().cmp(&b.window_minutes()))
                .then_with(|| a.id.cmp(&b.id))
        });

    let weekend_base = || match config.weekend_multiplier {
        Some(mult) if is_weekend(date) => config.base_price * mult,
        _ => config.base_price,
    };

    let price = match rule {
        Some(r) => {
            let base = r.base_price.unwrap_or_else(weekend_base);
            base + r.extra_charge.unwrap_or(Decimal::ZERO)
        }
        None => weekend_base(),
    };

    Quote {
        price: round_money(price.max(Decimal::ZERO)),
        applied_rule_id: rule.map(|r| r.id),
    }
}
