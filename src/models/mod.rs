pub mod booking;
pub mod disabled_slot;
pub mod price_rule;
pub mod resource;
pub mod slot;

pub use booking::{Booking, BookingStatus, PriceBreakdown};
pub use disabled_slot::DisabledSlot;
pub use price_rule::{is_weekend, DayType, PriceRule};
pub use resource::{Resource, SlotConfig};
pub use slot::{GeneratedSlot, SlotIdentity, SlotStatus, SlotView};
