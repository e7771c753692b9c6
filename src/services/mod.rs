pub mod notify;
pub mod payment;
pub mod reservation;
