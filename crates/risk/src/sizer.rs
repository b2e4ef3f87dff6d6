use rust_decimal::prelude::*;

use common::{Error, Result};

/// Quantity for spending `fraction` of `balance` at `price`.
///
/// Rounded half away from zero to `quantity_dp` decimals, the way the
/// exchange UI formats quantities.
pub fn size(balance: Decimal, fraction: Decimal, price: Decimal, quantity_dp: u32) -> Result<Decimal> {
    if price <= Decimal::ZERO {
        return Err(Error::InvalidPrice(format!("cannot size against price {price}")));
    }
    if fraction <= Decimal::ZERO || fraction > Decimal::ONE {
        return Err(Error::Config(format!("sizing fraction {fraction} outside (0, 1]")));
    }

    let notional = balance
        .checked_mul(fraction)
        .ok_or_else(|| Error::Other(format!("balance {balance} × {fraction} overflows")))?;
    let raw = notional
        .checked_div(price)
        .ok_or_else(|| Error::Other(format!("{notional} / {price} overflows")))?;
    let quantity = raw.round_dp_with_strategy(quantity_dp, RoundingStrategy::MidpointAwayFromZero);

    if quantity <= Decimal::ZERO {
        return Err(Error::InsufficientBalance(format!(
            "balance {balance} × {fraction} buys {quantity} at {price}"
        )));
    }
    Ok(quantity)
}

/// A configured fixed quantity, rounded to the instrument's precision.
pub fn fixed(quantity: Decimal, quantity_dp: u32) -> Result<Decimal> {
    let rounded = quantity.round_dp_with_strategy(quantity_dp, RoundingStrategy::MidpointAwayFromZero);
    if rounded <= Decimal::ZERO {
        return Err(Error::InvalidPlan(format!(
            "fixed quantity {quantity} rounds to {rounded} at {quantity_dp} dp"
        )));
    }
    Ok(rounded)
}

/// Converts an indicator-side close into an order-side price.
///
/// Goes through the shortest decimal rendering of the float so `0.0815`
/// stays `0.0815` instead of its binary expansion.
pub fn decimal_price(price: f64) -> Result<Decimal> {
    if !price.is_finite() || price <= 0.0 {
        return Err(Error::InvalidPrice(format!("price {price} is not a positive number")));
    }
    Decimal::from_str(&price.to_string())
        .map_err(|e| Error::InvalidPrice(format!("price {price}: {e}")))
}
