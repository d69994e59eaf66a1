//! Position ledger: cash, position and mark-to-market PnL for the traded leg.
//!
//! Every monetary field is [`Money`]. The accounting identity
//! `total_pnl == cash + position * last_mid` is re-established after every
//! quote and every trade once a mid is known.

use crate::domain::Side;
use crate::money::Money;
use thiserror::Error;

/// A fill or flatten the ledger cannot represent. State is left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("{side} {quantity} @ {price} overflows the ledger")]
    TradeOverflow {
        side: Side,
        price: f64,
        quantity: i64,
    },
    #[error("flattening {position} lots at {mid} overflows cash")]
    FlattenOverflow { position: i64, mid: Money },
}

#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    position: i64,
    cash: Money,
    last_mid: Option<Money>,
    total_pnl: Money,
    /// Best and worst PnL since the first mark. `None` until then.
    extremes: Option<(Money, Money)>,
    traded_lots: i64,
    max_abs_exposure: i64,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the traded leg's latest mid and re-mark.
    pub fn on_quote(&mut self, mid: f64) {
        self.last_mid = Some(Money::from_f64(mid));
        self.mark_to_market();
    }

    /// Apply a fill. Non-positive quantities are ignored.
    ///
    /// Every update is checked before any field changes, so a rejected fill
    /// leaves the ledger as it was.
    pub fn apply_trade(
        &mut self,
        side: Side,
        price: f64,
        quantity: i64,
    ) -> Result<(), LedgerError> {
        if quantity <= 0 {
            return Ok(());
        }
        let overflow = || LedgerError::TradeOverflow {
            side,
            price,
            quantity,
        };
        let cost = Money::from_f64(price)
            .checked_mul_lots(quantity)
            .ok_or_else(overflow)?;
        let cash = match side {
            Side::Buy => self.cash.checked_sub(cost),
            Side::Sell => self.cash.checked_add(cost),
        }
        .ok_or_else(overflow)?;
        let position = quantity
            .checked_mul(side.sign())
            .and_then(|delta| self.position.checked_add(delta))
            .ok_or_else(overflow)?;
        let exposure = position.checked_abs().ok_or_else(overflow)?;
        let traded_lots = self.traded_lots.checked_add(quantity).ok_or_else(overflow)?;

        self.cash = cash;
        self.position = position;
        self.traded_lots = traded_lots;
        self.max_abs_exposure = self.max_abs_exposure.max(exposure);
        self.mark_to_market();
        Ok(())
    }

    /// Realize the whole position at the last mid without recording a trade.
    ///
    /// No-op when flat or when no mid has been seen. The engine's forced
    /// closes go through [`apply_trade`](Self::apply_trade) instead so they
    /// count as traded lots.
    pub fn flatten_at_mid(&mut self) -> Result<(), LedgerError> {
        let Some(mid) = self.last_mid else {
            return Ok(());
        };
        if self.position == 0 {
            return Ok(());
        }
        let cash = mid
            .checked_mul_lots(self.position)
            .and_then(|value| self.cash.checked_add(value))
            .ok_or(LedgerError::FlattenOverflow {
                position: self.position,
                mid,
            })?;
        self.cash = cash;
        self.position = 0;
        self.mark_to_market();
        Ok(())
    }

    /// Total PnL saturates at the `Money` range when a mid jump pushes the
    /// position value past it.
    fn mark_to_market(&mut self) {
        let Some(mid) = self.last_mid else {
            return;
        };
        let value =
            i128::from(self.cash.raw()) + i128::from(mid.raw()) * i128::from(self.position);
        let clamped = value.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64;
        self.total_pnl = Money::from_raw(clamped);
        self.extremes = Some(match self.extremes {
            None => (self.total_pnl, self.total_pnl),
            Some((best, worst)) => (best.max(self.total_pnl), worst.min(self.total_pnl)),
        });
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn cash(&self) -> f64 {
        self.cash.to_f64()
    }

    pub fn has_mid(&self) -> bool {
        self.last_mid.is_some()
    }

    pub fn last_mid(&self) -> Option<f64> {
        self.last_mid.map(Money::to_f64)
    }

    pub fn last_mid_money(&self) -> Option<Money> {
        self.last_mid
    }

    pub fn total_pnl(&self) -> f64 {
        self.total_pnl.to_f64()
    }

    pub fn total_pnl_money(&self) -> Money {
        self.total_pnl
    }

    /// Best PnL seen; 0 before the first mark.
    pub fn best_pnl(&self) -> f64 {
        self.extremes.map_or(0.0, |(best, _)| best.to_f64())
    }

    /// Worst PnL seen; 0 before the first mark.
    pub fn worst_pnl(&self) -> f64 {
        self.extremes.map_or(0.0, |(_, worst)| worst.to_f64())
    }

    pub fn traded_lots(&self) -> i64 {
        self.traded_lots
    }

    pub fn max_abs_exposure(&self) -> i64 {
        self.max_abs_exposure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn initial_state() {
        let l = PositionLedger::new();
        assert_eq!(l.position(), 0);
        assert_eq!(l.total_pnl(), 0.0);
        assert_eq!(l.traded_lots(), 0);
        assert!(!l.has_mid());
        assert_eq!(l.last_mid(), None);
        assert_eq!(l.best_pnl(), 0.0);
        assert_eq!(l.worst_pnl(), 0.0);
    }

    #[test]
    fn quote_marks_without_touching_position() {
        let mut l = PositionLedger::new();
        l.on_quote(101.0);
        assert_eq!(l.position(), 0);
        assert_eq!(l.cash(), 0.0);
        assert_eq!(l.last_mid(), Some(101.0));
        assert_eq!(l.total_pnl(), 0.0);
    }

    #[test]
    fn long_position_marks_to_market() {
        let mut l = PositionLedger::new();
        l.on_quote(101.0);
        l.apply_trade(Side::Buy, 102.0, 1).unwrap();
        // Spread cost: -102 + 101.
        assert_eq!(l.total_pnl(), -1.0);

        l.on_quote(105.0);
        assert_eq!(l.total_pnl(), 3.0);
        assert_eq!(l.best_pnl(), 3.0);
        assert_eq!(l.worst_pnl(), -1.0);
    }

    #[test]
    fn round_trip_realizes_price_difference() {
        let mut l = PositionLedger::new();
        l.on_quote(101.0);
        l.apply_trade(Side::Buy, 102.0, 1).unwrap();
        l.on_quote(90.0);
        l.apply_trade(Side::Sell, 100.0, 1).unwrap();
        assert_eq!(l.position(), 0);
        assert!((l.total_pnl() - -2.0).abs() < EPS);
    }

    #[test]
    fn short_round_trip() {
        let mut l = PositionLedger::new();
        l.apply_trade(Side::Sell, 100.0, 1).unwrap();
        assert_eq!(l.position(), -1);
        assert_eq!(l.cash(), 100.0);

        l.on_quote(90.0);
        assert_eq!(l.total_pnl(), 10.0);

        l.apply_trade(Side::Buy, 91.0, 1).unwrap();
        assert_eq!(l.position(), 0);
        assert_eq!(l.total_pnl(), 9.0);
    }

    #[test]
    fn non_positive_quantity_is_ignored() {
        let mut l = PositionLedger::new();
        l.on_quote(100.0);
        l.apply_trade(Side::Buy, 100.0, 0).unwrap();
        l.apply_trade(Side::Sell, 100.0, -3).unwrap();
        assert_eq!(l.position(), 0);
        assert_eq!(l.cash(), 0.0);
        assert_eq!(l.traded_lots(), 0);
        assert_eq!(l.max_abs_exposure(), 0);
    }

    #[test]
    fn tracks_max_exposure() {
        let mut l = PositionLedger::new();
        l.apply_trade(Side::Buy, 100.0, 1).unwrap();
        assert_eq!(l.max_abs_exposure(), 1);
        l.apply_trade(Side::Buy, 100.0, 2).unwrap();
        assert_eq!(l.max_abs_exposure(), 3);
        l.apply_trade(Side::Sell, 100.0, 1).unwrap();
        assert_eq!(l.max_abs_exposure(), 3);
        assert_eq!(l.traded_lots(), 4);
    }

    #[test]
    fn flatten_realizes_at_mid() {
        let mut l = PositionLedger::new();
        l.on_quote(100.0);
        l.apply_trade(Side::Buy, 100.0, 5).unwrap();
        l.on_quote(110.0);

        l.flatten_at_mid().unwrap();
        assert_eq!(l.position(), 0);
        assert_eq!(l.total_pnl(), 50.0);
        // Flatten is not a trade.
        assert_eq!(l.traded_lots(), 5);
    }

    #[test]
    fn flatten_is_idempotent() {
        let mut l = PositionLedger::new();
        l.on_quote(100.0);
        l.apply_trade(Side::Sell, 101.0, 2).unwrap();
        l.on_quote(99.0);
        l.flatten_at_mid().unwrap();
        let cash = l.cash();
        let pnl = l.total_pnl();

        l.flatten_at_mid().unwrap();
        assert_eq!(l.position(), 0);
        assert_eq!(l.cash(), cash);
        assert_eq!(l.total_pnl(), pnl);
    }

    #[test]
    fn flatten_without_mid_is_noop() {
        let mut l = PositionLedger::new();
        l.apply_trade(Side::Buy, 100.0, 2).unwrap();
        l.flatten_at_mid().unwrap();
        assert_eq!(l.position(), 2);
        assert_eq!(l.cash(), -200.0);
    }

    #[test]
    fn pnl_is_exact_after_many_marks() {
        let mut l = PositionLedger::new();
        l.on_quote(100.0);
        l.apply_trade(Side::Buy, 100.1, 3).unwrap();
        for i in 0..100_000 {
            l.on_quote(100.0 + (i % 7) as f64 * 0.1);
        }
        l.on_quote(100.1);
        assert_eq!(l.total_pnl_money(), Money::ZERO);
        assert_eq!(l.total_pnl(), 0.0);
    }

    #[test]
    fn overflowing_fill_is_rejected_without_side_effects() {
        let mut l = PositionLedger::new();
        l.on_quote(100.0);
        l.apply_trade(Side::Buy, 100.0, 1).unwrap();

        let err = l.apply_trade(Side::Buy, 1e13, 2).unwrap_err();
        assert!(matches!(err, LedgerError::TradeOverflow { quantity: 2, .. }));
        assert_eq!(l.position(), 1);
        assert_eq!(l.cash(), -100.0);
        assert_eq!(l.traded_lots(), 1);

        assert!(l.apply_trade(Side::Sell, 1.0, i64::MAX).is_err());
        assert_eq!(l.position(), 1);
    }

    #[test]
    fn extreme_mid_saturates_pnl() {
        let mut l = PositionLedger::new();
        l.apply_trade(Side::Buy, 100.0, 1_000).unwrap();
        l.on_quote(1e13);
        assert_eq!(l.total_pnl_money(), Money::from_raw(i64::MAX));
        assert_eq!(l.position(), 1_000);
        assert!(matches!(
            l.flatten_at_mid(),
            Err(LedgerError::FlattenOverflow { position: 1_000, .. })
        ));
        assert_eq!(l.position(), 1_000);
    }
}
