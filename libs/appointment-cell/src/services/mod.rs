pub mod availability;
pub mod booking;
pub mod booking_form;
pub mod flow;
pub mod lifecycle;
