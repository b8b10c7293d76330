//! FIFO lot consumption.

use rust_decimal::Decimal;

use super::error::WalletError;
use super::item::ItemDetail;
use super::kind::Kind;

/// Draws `amount` from `lots`, oldest first.
///
/// The slice is put in FIFO order (`created_at`, then id) before the walk.
/// Each lot absorbs as much of the remainder as it holds; lots that are
/// already empty are skipped. Returns the indices, in the sorted slice, of
/// every lot whose amount changed.
///
/// When the lots cannot cover the request the slice is left partially
/// drawn and `InsufficientFunds` is returned; callers must discard it.
///
/// # Errors
///
/// `InsufficientFunds` on a shortfall, `CorruptState` on a negative lot.
pub fn consume_fifo(
    kind: Kind,
    lots: &mut [ItemDetail],
    amount: Decimal,
    now: i64,
) -> Result<Vec<usize>, WalletError> {
    let mut touched = Vec::new();
    if amount <= Decimal::ZERO {
        return Ok(touched);
    }

    lots.sort_by_key(ItemDetail::fifo_key);

    let mut remaining = amount;
    for (index, lot) in lots.iter_mut().enumerate() {
        if remaining.is_zero() {
            break;
        }
        if lot.amount < Decimal::ZERO {
            return Err(WalletError::CorruptState(format!(
                "lot {} of {kind} holds a negative amount {}",
                lot.id, lot.amount
            )));
        }
        if lot.amount.is_zero() {
            continue;
        }

        if lot.amount >= remaining {
            lot.amount -= remaining;
            remaining = Decimal::ZERO;
        } else {
            remaining -= lot.amount;
            lot.amount = Decimal::ZERO;
        }
        lot.updated_at = now;
        touched.push(index);
    }

    if remaining > Decimal::ZERO {
        return Err(WalletError::InsufficientFunds {
            kind,
            requested: amount,
            shortfall: remaining,
        });
    }

    Ok(touched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn lots(amounts: &[Decimal]) -> Vec<ItemDetail> {
        amounts
            .iter()
            .zip(1_i64..)
            .map(|(amount, at)| ItemDetail::credit("u1", Kind::Gold, *amount, at * 1_000))
            .collect()
    }

    fn remaining(lots: &[ItemDetail]) -> Vec<Decimal> {
        lots.iter().map(|lot| lot.amount).collect()
    }

    #[test]
    fn test_oldest_lots_are_drawn_first() {
        let mut lots = lots(&[dec!(5), dec!(10), dec!(3)]);
        let touched = consume_fifo(Kind::Gold, &mut lots, dec!(12), 9_000).unwrap();

        assert_eq!(remaining(&lots), vec![dec!(0), dec!(3), dec!(3)]);
        assert_eq!(touched, vec![0, 1]);
        assert_eq!(lots[0].updated_at, 9_000);
        assert_eq!(lots[2].updated_at, 3_000);
    }

    #[test]
    fn test_unsorted_input_is_sorted_first() {
        let mut lots = lots(&[dec!(5), dec!(10), dec!(3)]);
        lots.reverse();
        consume_fifo(Kind::Gold, &mut lots, dec!(6), 9_000).unwrap();
        assert_eq!(remaining(&lots), vec![dec!(0), dec!(9), dec!(3)]);
    }

    #[rstest]
    #[case(dec!(5), vec![dec!(0), dec!(10), dec!(3)], vec![0])]
    #[case(dec!(4), vec![dec!(1), dec!(10), dec!(3)], vec![0])]
    #[case(dec!(15), vec![dec!(0), dec!(0), dec!(3)], vec![0, 1])]
    #[case(dec!(18), vec![dec!(0), dec!(0), dec!(0)], vec![0, 1, 2])]
    fn test_walk_boundaries(
        #[case] amount: Decimal,
        #[case] expected: Vec<Decimal>,
        #[case] expected_touched: Vec<usize>,
    ) {
        let mut lots = lots(&[dec!(5), dec!(10), dec!(3)]);
        let touched = consume_fifo(Kind::Gold, &mut lots, amount, 9_000).unwrap();
        assert_eq!(remaining(&lots), expected);
        assert_eq!(touched, expected_touched);
    }

    #[test]
    fn test_empty_lots_are_skipped() {
        let mut lots = lots(&[dec!(0), dec!(4)]);
        let touched = consume_fifo(Kind::Gold, &mut lots, dec!(4), 9_000).unwrap();
        assert_eq!(touched, vec![1]);
        assert_eq!(lots[0].updated_at, 1_000);
    }

    #[test]
    fn test_shortfall_is_reported() {
        let mut lots = lots(&[dec!(25), dec!(15)]);
        let err = consume_fifo(Kind::Gold, &mut lots, dec!(100), 9_000).unwrap_err();
        assert!(matches!(
            err,
            WalletError::InsufficientFunds { kind: Kind::Gold, requested, shortfall }
                if requested == dec!(100) && shortfall == dec!(60)
        ));
    }

    #[test]
    fn test_no_lots_is_insufficient() {
        let err = consume_fifo(Kind::Silver, &mut [], dec!(1), 9_000).unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_FUNDS");
    }

    #[test]
    fn test_non_positive_amount_touches_nothing() {
        let mut lots = lots(&[dec!(5)]);
        for amount in [dec!(0), dec!(-2)] {
            let touched = consume_fifo(Kind::Gold, &mut lots, amount, 9_000).unwrap();
            assert!(touched.is_empty());
        }
        assert_eq!(remaining(&lots), vec![dec!(5)]);
    }

    #[test]
    fn test_negative_lot_is_corrupt() {
        let mut lots = lots(&[dec!(-1), dec!(5)]);
        let err = consume_fifo(Kind::Gold, &mut lots, dec!(2), 9_000).unwrap_err();
        assert!(matches!(err, WalletError::CorruptState(_)));
    }

    #[test]
    fn test_fractional_amounts() {
        let mut lots = lots(&[dec!(0.1), dec!(0.2)]);
        consume_fifo(Kind::Gold, &mut lots, dec!(0.3), 9_000).unwrap();
        assert_eq!(remaining(&lots), vec![dec!(0), dec!(0)]);
    }
}
