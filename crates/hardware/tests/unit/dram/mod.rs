pub mod arbitration;
pub mod controller;
pub mod watchdog;
