pub mod barber;
pub mod customer;
pub mod events;
pub mod public;
