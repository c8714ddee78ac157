//! 零件計價

use invoice_core::PartLineItem;
use rust_decimal::Decimal;

/// 零件單價 = 單位成本 × (1 + 毛利率 / 100)
///
/// 毛利率無效時為 0；金額超出 `Decimal` 範圍時回傳 None。
pub fn compute_part_price(part: &PartLineItem) -> Option<Decimal> {
    let Some(margin) = part.margin.value() else {
        return Some(Decimal::ZERO);
    };
    let factor = Decimal::ONE.checked_add(margin.checked_div(Decimal::ONE_HUNDRED)?)?;
    part.unit_cost.checked_mul(factor)
}

/// 零件金額 = 單價 × 計價數量
pub fn compute_part_amount(part: &PartLineItem) -> Option<Decimal> {
    compute_part_price(part)?.checked_mul(part.billable_quantity())
}

/// 工單中任一零件（不論是否選取）毛利率無效即為 true
pub fn has_invalid_margins<'a, I>(parts: I) -> bool
where
    I: IntoIterator<Item = &'a PartLineItem>,
{
    parts.into_iter().any(|p| !p.margin.is_valid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(100, "25", Decimal::from(125))]
    #[case(100, "0", Decimal::from(100))]
    #[case(80, "12.5", Decimal::from(90))]
    #[case(100, "", Decimal::ZERO)]
    #[case(100, "n/a", Decimal::ZERO)]
    fn test_compute_part_price(#[case] cost: i64, #[case] margin: &str, #[case] expected: Decimal) {
        let part = PartLineItem::new("P1", "Part", Decimal::from(cost)).with_margin_input(margin);
        assert_eq!(compute_part_price(&part), Some(expected));
    }

    #[test]
    fn test_part_amount_uses_quantity() {
        let part = PartLineItem::new("P1", "Rotor", Decimal::from(100))
            .with_quantity(2)
            .with_margin(Decimal::from(25));
        assert_eq!(compute_part_amount(&part), Some(Decimal::from(250)));

        // 數量 <= 0 不計價
        let part = part.with_quantity(0);
        assert_eq!(compute_part_amount(&part), Some(Decimal::ZERO));
    }

    #[test]
    fn test_huge_margin_overflows_to_none() {
        let part = PartLineItem::new("P1", "Rotor", Decimal::from(1000))
            .with_margin_input("79228162514264337593543950335");
        assert!(part.margin.is_valid());
        assert_eq!(compute_part_price(&part), None);
        assert_eq!(compute_part_amount(&part), None);

        let part = PartLineItem::new("P2", "Rotor", Decimal::MAX)
            .with_quantity(2)
            .with_margin(Decimal::ZERO);
        assert_eq!(compute_part_price(&part), Some(Decimal::MAX));
        assert_eq!(compute_part_amount(&part), None);
    }

    #[test]
    fn test_invalid_margin_detection_covers_all_parts() {
        let parts = vec![
            PartLineItem::new("P1", "Rotor", Decimal::from(100)).with_margin(Decimal::from(25)),
            PartLineItem::new("P2", "Pads", Decimal::from(40)),
        ];
        assert!(has_invalid_margins(&parts));
        assert!(!has_invalid_margins(&parts[..1]));
        assert!(!has_invalid_margins(&Vec::<PartLineItem>::new()));
    }

    proptest! {
        #[test]
        fn prop_price_monotonic_in_margin(
            cost in 0i64..1_000_000,
            m1 in 0i64..10_000,
            m2 in 0i64..10_000,
        ) {
            let (lo, hi) = if m1 <= m2 { (m1, m2) } else { (m2, m1) };
            let cost = Decimal::new(cost, 2);
            let low = PartLineItem::new("P", "x", cost).with_margin(Decimal::new(lo, 1));
            let high = PartLineItem::new("P", "x", cost).with_margin(Decimal::new(hi, 1));

            prop_assert!(compute_part_price(&low).unwrap() <= compute_part_price(&high).unwrap());
        }

        #[test]
        fn prop_zero_margin_is_unit_cost(cost in 0i64..1_000_000) {
            let cost = Decimal::new(cost, 2);
            let part = PartLineItem::new("P", "x", cost).with_margin(Decimal::ZERO);
            prop_assert_eq!(compute_part_price(&part), Some(cost));
        }
    }
}
