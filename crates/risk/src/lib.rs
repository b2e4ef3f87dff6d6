//! Position sizing and exit composition.
//!
//! Pure functions: the cycle feeds them a balance, a price and the bot's
//! exit parameters and gets back either a quantity or a complete plan.

pub mod composer;
pub mod sizer;

pub use composer::{compose, ExitParams};
pub use sizer::{decimal_price, fixed, size};
