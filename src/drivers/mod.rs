//! Status indicator, ADC bring-up and the task watchdog.

pub mod hw_init;
pub mod link_indicator;
pub mod watchdog;
