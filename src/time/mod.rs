//! Time handling: clocks, wall-clock zones and the weekday/time-of-day formats the
//! store uses.

pub mod source;
pub mod weekday;
pub mod zone;
