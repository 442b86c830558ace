pub mod availability;
pub mod events;
pub mod locks;
pub mod pricing;
pub mod reservation;
pub mod slots;
pub mod sweeper;
