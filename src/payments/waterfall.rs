use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::PaymentAllocation;

/// buckets in the order a payment is applied to them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaterfallBucket {
    LateFee,
    EarlyRepaymentFee,
    LoanFees,
    Interest,
    Principal,
}

impl WaterfallBucket {
    /// fixed application order
    pub const ORDER: [WaterfallBucket; 5] = [
        WaterfallBucket::LateFee,
        WaterfallBucket::EarlyRepaymentFee,
        WaterfallBucket::LoanFees,
        WaterfallBucket::Interest,
        WaterfallBucket::Principal,
    ];
}

/// amounts owed per bucket at the time of payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AmountsDue {
    pub late_fee: Money,
    pub early_fee: Money,
    pub loan_fees: Money,
    pub interest: Money,
    /// outstanding principal; `None` lets principal absorb any remainder
    pub principal: Option<Money>,
}

impl AmountsDue {
    /// total owed, when principal is bounded
    pub fn total(&self) -> Option<Money> {
        self.principal
            .map(|p| self.late_fee + self.early_fee + self.loan_fees + self.interest + p)
    }

    fn cap(&self, bucket: WaterfallBucket) -> Option<Money> {
        match bucket {
            WaterfallBucket::LateFee => Some(self.late_fee),
            WaterfallBucket::EarlyRepaymentFee => Some(self.early_fee),
            WaterfallBucket::LoanFees => Some(self.loan_fees),
            WaterfallBucket::Interest => Some(self.interest),
            WaterfallBucket::Principal => self.principal,
        }
    }
}

/// Split `gross` across the buckets in [`WaterfallBucket::ORDER`].
///
/// Each bucket takes `min(remaining, due)`; negative dues count as zero.
/// Whatever no bucket absorbs is reported as `leftover`, so the buckets plus
/// leftover always add back to `gross`.
pub fn apply_waterfall(gross: Money, due: &AmountsDue) -> PaymentAllocation {
    let mut allocation = PaymentAllocation::default();
    let mut remaining = gross.clamp_non_negative();

    for bucket in WaterfallBucket::ORDER {
        if remaining.is_zero() {
            break;
        }

        let paid = match due.cap(bucket) {
            Some(cap) => remaining.min(cap.clamp_non_negative()),
            None => remaining,
        };

        let slot = match bucket {
            WaterfallBucket::LateFee => &mut allocation.to_late_fee,
            WaterfallBucket::EarlyRepaymentFee => &mut allocation.to_early_fee,
            WaterfallBucket::LoanFees => &mut allocation.to_loan_fees,
            WaterfallBucket::Interest => &mut allocation.to_interest,
            WaterfallBucket::Principal => &mut allocation.to_principal,
        };
        *slot = paid;
        remaining -= paid;
    }

    // a negative gross is carried through untouched
    allocation.leftover = if gross.is_negative() { gross } else { remaining };
    allocation
}

/// allocate with principal absorbing the whole remainder
pub fn allocate(
    gross: Money,
    late_fee: Money,
    early_fee: Money,
    fixed_loan_fees: Money,
    interest_due: Money,
) -> PaymentAllocation {
    apply_waterfall(
        gross,
        &AmountsDue {
            late_fee,
            early_fee,
            loan_fees: fixed_loan_fees,
            interest: interest_due,
            principal: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn due() -> AmountsDue {
        AmountsDue {
            late_fee: Money::from_major(25),
            early_fee: Money::from_major(10),
            loan_fees: Money::from_major(15),
            interest: Money::from_major(50),
            principal: Some(Money::from_major(1_000)),
        }
    }

    #[test]
    fn test_interest_then_principal() {
        let result = allocate(
            Money::from_major(103),
            Money::ZERO,
            Money::ZERO,
            Money::ZERO,
            Money::from_major(12),
        );

        assert_eq!(result.to_interest, Money::from_major(12));
        assert_eq!(result.to_principal, Money::from_major(91));
        assert_eq!(result.total_fees(), Money::ZERO);
        assert_eq!(result.leftover, Money::ZERO);
    }

    #[test]
    fn test_late_fee_absorbs_small_payment() {
        let result = allocate(
            Money::from_major(25),
            Money::from_major(25),
            Money::ZERO,
            Money::ZERO,
            Money::from_major(12),
        );

        assert_eq!(result.to_late_fee, Money::from_major(25));
        assert_eq!(result.to_interest, Money::ZERO);
        assert_eq!(result.to_principal, Money::ZERO);
    }

    #[test]
    fn test_order_is_fees_interest_principal() {
        let result = apply_waterfall(Money::from_major(70), &due());

        assert_eq!(result.to_late_fee, Money::from_major(25));
        assert_eq!(result.to_early_fee, Money::from_major(10));
        assert_eq!(result.to_loan_fees, Money::from_major(15));
        assert_eq!(result.to_interest, Money::from_major(20));
        assert_eq!(result.to_principal, Money::ZERO);
    }

    #[test]
    fn test_capped_principal_reports_leftover() {
        let result = apply_waterfall(Money::from_major(1_200), &due());

        assert_eq!(result.to_principal, Money::from_major(1_000));
        assert_eq!(result.leftover, Money::from_major(100));
        assert_eq!(result.gross(), Money::from_major(1_200));
        assert_eq!(due().total(), Some(Money::from_major(1_100)));
    }

    #[test]
    fn test_uncapped_principal_takes_everything() {
        let result = allocate(
            Money::from_major(5_000),
            Money::ZERO,
            Money::ZERO,
            Money::ZERO,
            Money::ZERO,
        );
        assert_eq!(result.to_principal, Money::from_major(5_000));
        assert_eq!(result.leftover, Money::ZERO);
    }

    #[test]
    fn test_degenerate_inputs_are_total() {
        let zero = apply_waterfall(Money::ZERO, &due());
        assert_eq!(zero, PaymentAllocation::default());

        let negative = apply_waterfall(Money::from_major(-5), &due());
        assert_eq!(negative.total_applied(), Money::ZERO);
        assert_eq!(negative.gross(), Money::from_major(-5));

        let negative_dues = AmountsDue {
            late_fee: Money::from_major(-10),
            ..due()
        };
        let result = apply_waterfall(Money::from_major(20), &negative_dues);
        assert_eq!(result.to_late_fee, Money::ZERO);
        assert_eq!(result.to_early_fee, Money::from_major(10));
    }

    fn cents(max: i64) -> impl Strategy<Value = Money> {
        (0..max).prop_map(Money::from_minor)
    }

    proptest! {
        #[test]
        fn buckets_sum_to_gross(
            gross in cents(10_000_000),
            late in cents(100_000),
            early in cents(100_000),
            fees in cents(100_000),
            interest in cents(1_000_000),
            principal in proptest::option::of(cents(10_000_000)),
        ) {
            let due = AmountsDue { late_fee: late, early_fee: early, loan_fees: fees, interest, principal };
            let result = apply_waterfall(gross, &due);

            prop_assert_eq!(result.gross(), gross);
            prop_assert!(result.to_late_fee <= late);
            prop_assert!(result.to_early_fee <= early);
            prop_assert!(result.to_loan_fees <= fees);
            prop_assert!(result.to_interest <= interest);
            if let Some(cap) = principal {
                prop_assert!(result.to_principal <= cap);
            } else {
                prop_assert_eq!(result.leftover, Money::ZERO);
            }
        }

        #[test]
        fn earlier_buckets_fill_first(
            gross in cents(1_000_000),
            late in cents(100_000),
            interest in cents(100_000),
        ) {
            let result = allocate(gross, late, Money::ZERO, Money::ZERO, interest);
            if result.to_interest.is_positive() {
                prop_assert_eq!(result.to_late_fee, late);
            }
            if result.to_principal.is_positive() {
                prop_assert_eq!(result.to_interest, interest);
            }
        }
    }
}
