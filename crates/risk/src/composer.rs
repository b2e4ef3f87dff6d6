use rust_decimal::prelude::*;
use tracing::debug;

use common::{Direction, Error, ExitKind, OrderPlan, Result};

/// Exit placement for a bot, in percent of the entry price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitParams {
    pub stop_loss_pct: Decimal,
    pub take_profit_pct: Decimal,
    pub take_profit_kind: ExitKind,
    pub price_dp: u32,
}

/// Builds the entry plus take-profit and stop-loss for one signal.
///
/// Both exit prices sit on the far side of `entry_price` from each other
/// after rounding; a level that rounds onto the entry is rejected as
/// `InvalidPlan` rather than submitted.
pub fn compose(
    symbol: &str,
    direction: Direction,
    entry_price: Decimal,
    quantity: Decimal,
    params: &ExitParams,
) -> Result<OrderPlan> {
    if entry_price <= Decimal::ZERO {
        return Err(Error::InvalidPrice(format!("{symbol}: entry price {entry_price}")));
    }
    if quantity <= Decimal::ZERO {
        return Err(Error::InvalidPlan(format!("{symbol}: quantity {quantity}")));
    }
    if params.take_profit_kind == ExitKind::StopMarket {
        return Err(Error::InvalidPlan(
            "take-profit must be a LIMIT or TAKE_PROFIT_MARKET order".into(),
        ));
    }

    let sl_offset = params.stop_loss_pct / Decimal::ONE_HUNDRED;
    let tp_offset = params.take_profit_pct / Decimal::ONE_HUNDRED;
    let (stop_loss, take_profit) = match direction {
        Direction::Long => (
            entry_price * (Decimal::ONE - sl_offset),
            entry_price * (Decimal::ONE + tp_offset),
        ),
        Direction::Short => (
            entry_price * (Decimal::ONE + sl_offset),
            entry_price * (Decimal::ONE - tp_offset),
        ),
    };
    let stop_loss = round_price(stop_loss, params.price_dp);
    let take_profit = round_price(take_profit, params.price_dp);

    let ordered = match direction {
        Direction::Long => stop_loss < entry_price && entry_price < take_profit,
        Direction::Short => take_profit < entry_price && entry_price < stop_loss,
    };
    if !ordered || stop_loss <= Decimal::ZERO || take_profit <= Decimal::ZERO {
        return Err(Error::InvalidPlan(format!(
            "{symbol} {direction}: SL {stop_loss} / TP {take_profit} do not bracket entry {entry_price} at {} dp",
            params.price_dp
        )));
    }

    debug!(%symbol, %direction, %entry_price, %stop_loss, %take_profit, %quantity, "Plan composed");
    Ok(OrderPlan {
        symbol: symbol.to_string(),
        direction,
        quantity,
        entry_price,
        take_profit,
        stop_loss,
        take_profit_kind: params.take_profit_kind,
    })
}

fn round_price(price: Decimal, dp: u32) -> Decimal {
    price.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderInstruction, OrderSide};
    use rust_decimal_macros::dec;

    fn params(price_dp: u32) -> ExitParams {
        ExitParams {
            stop_loss_pct: dec!(0.8),
            take_profit_pct: dec!(1.5),
            take_profit_kind: ExitKind::TakeProfitMarket,
            price_dp,
        }
    }

    #[test]
    fn long_exits_bracket_entry() {
        let plan = compose("DOGEUSDT", Direction::Long, dec!(100), dec!(20), &params(4)).unwrap();
        assert_eq!(plan.stop_loss, dec!(99.2));
        assert_eq!(plan.take_profit, dec!(101.5));
    }

    #[test]
    fn short_exits_bracket_entry() {
        let plan = compose("DOGEUSDT", Direction::Short, dec!(100), dec!(20), &params(4)).unwrap();
        assert_eq!(plan.stop_loss, dec!(100.8));
        assert_eq!(plan.take_profit, dec!(98.5));
    }

    #[test]
    fn prices_are_rounded_to_precision() {
        let plan = compose("DOGEUSDT", Direction::Long, dec!(0.08153), dec!(20), &params(4)).unwrap();
        // 0.08153 × 0.992 = 0.08087776, × 1.015 = 0.08275295
        assert_eq!(plan.stop_loss, dec!(0.0809));
        assert_eq!(plan.take_profit, dec!(0.0828));
    }

    #[test]
    fn collapsed_levels_are_rejected() {
        // 0.8% of 0.05 is below one tick at 2 dp.
        let err = compose("DOGEUSDT", Direction::Long, dec!(0.05), dec!(20), &params(2)).unwrap_err();
        assert!(matches!(err, Error::InvalidPlan(_)), "{err}");
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            compose("X", Direction::Long, Decimal::ZERO, dec!(1), &params(4)),
            Err(Error::InvalidPrice(_))
        ));
        assert!(matches!(
            compose("X", Direction::Long, dec!(1), Decimal::ZERO, &params(4)),
            Err(Error::InvalidPlan(_))
        ));
        let stop_tp = ExitParams {
            take_profit_kind: ExitKind::StopMarket,
            ..params(4)
        };
        assert!(compose("X", Direction::Long, dec!(1), dec!(1), &stop_tp).is_err());
    }

    #[test]
    fn instructions_close_on_opposite_side() {
        let limit = ExitParams {
            take_profit_kind: ExitKind::Limit,
            ..params(4)
        };
        let plan = compose("XRPUSDT", Direction::Short, dec!(0.5), dec!(100), &limit).unwrap();
        let [entry, tp, sl] = plan.instructions();

        assert_eq!(entry.side(), OrderSide::Sell);
        assert!(entry.is_entry());
        assert_eq!(
            tp,
            OrderInstruction::Exit {
                symbol: "XRPUSDT".into(),
                side: OrderSide::Buy,
                quantity: dec!(100),
                kind: ExitKind::Limit,
                price: dec!(0.4925),
            }
        );
        assert_eq!(sl.label(), "STOP_MARKET");
        assert_eq!(sl.side(), OrderSide::Buy);
    }
}
