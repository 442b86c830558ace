use chrono::Duration;

use crate::models::{GeneratedSlot, SlotConfig};

/// Derive the ordered slot sequence for a resource from its configuration.
///
/// Pure and deterministic: the same config always yields byte-identical
/// output, so a slot identity computed at quote time matches the one used
/// at booking time, even across processes. A disabled config, a non-positive
/// duration, or opening >= closing yields zero slots rather than an error.
/// The final partial window, if any, is dropped, never truncated.
pub fn generate(config: &SlotConfig) -> Vec<GeneratedSlot> {
    if !config.enabled
        || config.slot_duration_minutes <= 0
        || config.opening_time >= config.closing_time
    {
        return Vec::new();
    }

    let step = Duration::minutes(config.slot_duration_minutes as i64);
    let mut slots = Vec::new();
    let mut cursor = config.opening_time;

    loop {
        // overflowing_add_signed reports midnight wrap-around; a window that
        // wraps can never fit before closing_time.
        let (end, wrapped) = cursor.overflowing_add_signed(step);
        if wrapped != 0 || end > config.closing_time {
            break;
        }
        slots.push(GeneratedSlot {
            start_time: cursor,
            end_time: end,
            duration_minutes: config.slot_duration_minutes,
            base_price: config.base_price,
            display_order: slots.len() as i32,
        });
        cursor = end;
    }

    slots
}
