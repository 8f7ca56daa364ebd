#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::holdings::{Holding, HoldingMethod};
    use crate::operations::{Operation, OperationKind, OperationMeta, TradeDetails};
    use crate::reconcile::{reconcile, reconcile_from, reconcile_key};
    use crate::timing::{SettlementRules, SettlementTiming};

    const CODE: &str = "110022";

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn op(kind: OperationKind, date: &str, next: Option<Holding>) -> Operation {
        Operation::build(
            CODE,
            kind,
            None,
            next,
            OperationMeta {
                date: d(date),
                timing: SettlementTiming::Before,
                is_qdii: false,
            },
            now(),
            &SettlementRules::default(),
        )
    }

    fn details(amount: Option<Decimal>, shares: Option<Decimal>, nav: Option<Decimal>) -> TradeDetails {
        TradeDetails {
            method: if shares.is_some() {
                HoldingMethod::Shares
            } else {
                HoldingMethod::Amount
            },
            amount,
            shares,
            nav,
            fee_rate: Decimal::ZERO,
            fee: Decimal::ZERO,
        }
    }

    fn buy(amount: Decimal, nav: Option<Decimal>, fee: Decimal, date: &str) -> Operation {
        let mut details = details(Some(amount), None, nav);
        details.fee = fee;
        op(OperationKind::Add(details), date, None)
    }

    fn sell(shares: Decimal, nav: Option<Decimal>, date: &str) -> Operation {
        op(OperationKind::Reduce(details(None, Some(shares), nav)), date, None)
    }

    fn edit(holding: Holding, date: &str) -> Operation {
        op(OperationKind::Edit, date, Some(holding))
    }

    #[test]
    fn test_single_add_conserves_amount() {
        let ops = vec![buy(dec!(1000), Some(dec!(1.0)), Decimal::ZERO, "2024-05-10")];

        let holding = reconcile(CODE, &ops, dec!(1.0)).unwrap();

        assert_eq!(holding.method, HoldingMethod::Shares);
        assert_eq!(holding.shares, Some(dec!(1000)));
        assert_eq!(holding.cost_price, Some(dec!(1.0)));
        assert_eq!(holding.amount, Some(dec!(1000)));
        assert_eq!(holding.profit, Some(dec!(0)));
        assert_eq!(holding.first_buy, Some(d("2024-05-10")));
    }

    #[test]
    fn test_fee_is_part_of_cost() {
        let ops = vec![buy(dec!(1000), Some(dec!(1.0)), dec!(1.50), "2024-05-10")];

        let holding = reconcile(CODE, &ops, dec!(1.0)).unwrap();

        assert_eq!(holding.shares, Some(dec!(1000)));
        // cost 1001.50 over 1000 shares
        assert_eq!(holding.cost_price, Some(dec!(1.0015)));
        assert_eq!(holding.profit, Some(dec!(-1.50)));
    }

    #[test]
    fn test_partial_sell_scales_cost() {
        let ops = vec![
            edit(Holding::by_shares(CODE, dec!(100), dec!(1.0)), "2024-05-06"),
            sell(dec!(40), Some(dec!(1.2)), "2024-05-10"),
        ];

        let holding = reconcile(CODE, &ops, dec!(1.2)).unwrap();

        assert_eq!(holding.shares, Some(dec!(60)));
        assert_eq!(holding.cost_price, Some(dec!(1.0)));
        assert_eq!(holding.amount, Some(dec!(72)));
        assert_eq!(holding.profit, Some(dec!(12)));
    }

    #[test]
    fn test_oversell_clamps_to_no_holding() {
        let ops = vec![
            buy(dec!(100), Some(dec!(1.0)), Decimal::ZERO, "2024-05-06"),
            sell(dec!(250), Some(dec!(1.1)), "2024-05-10"),
        ];

        assert_eq!(reconcile(CODE, &ops, dec!(1.1)), None);
    }

    #[test]
    fn test_replay_is_idempotent() {
        let ops = vec![
            buy(dec!(1000), Some(dec!(1.25)), dec!(1.5), "2024-05-06"),
            buy(dec!(500), None, Decimal::ZERO, "2024-05-08"),
            sell(dec!(120), Some(dec!(1.3)), "2024-05-10"),
        ];

        let first = reconcile(CODE, &ops, dec!(1.31));
        let second = reconcile(CODE, &ops, dec!(1.31));

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(
            reconcile_key(None, &ops, dec!(1.31)),
            reconcile_key(None, &ops, dec!(1.31))
        );
    }

    #[test]
    fn test_replays_by_order_date() {
        // Recorded out of order: the sell was entered first but happened later.
        let ops = vec![
            sell(dec!(50), Some(dec!(1.0)), "2024-05-10"),
            buy(dec!(100), Some(dec!(1.0)), Decimal::ZERO, "2024-05-06"),
        ];

        let holding = reconcile(CODE, &ops, dec!(1.0)).unwrap();
        assert_eq!(holding.shares, Some(dec!(50)));
        assert_eq!(holding.first_buy, Some(d("2024-05-06")));
    }

    #[test]
    fn test_unresolved_nav_prices_at_latest() {
        let ops = vec![buy(dec!(1200), None, Decimal::ZERO, "2024-05-10")];

        let holding = reconcile(CODE, &ops, dec!(1.2)).unwrap();
        assert_eq!(holding.shares, Some(dec!(1000)));
    }

    #[test]
    fn test_shares_only_add_is_valued_at_latest_nav() {
        // Settled at 1.0, but a shares-only buy is costed at the latest NAV.
        let ops = vec![op(
            OperationKind::Add(details(None, Some(dec!(100)), Some(dec!(1.0)))),
            "2024-05-10",
            None,
        )];

        let holding = reconcile(CODE, &ops, dec!(1.5)).unwrap();
        assert_eq!(holding.shares, Some(dec!(100)));
        assert_eq!(holding.cost_price, Some(dec!(1.5)));
        assert_eq!(holding.amount, Some(dec!(150)));
        assert_eq!(holding.profit, Some(dec!(0)));
    }

    #[test]
    fn test_shares_only_add_keeps_fee_in_cost() {
        let mut details = details(None, Some(dec!(200)), Some(dec!(1.5)));
        details.fee = dec!(0.60);
        let ops = vec![op(OperationKind::Add(details), "2024-05-10", None)];

        let holding = reconcile(CODE, &ops, dec!(1.6)).unwrap();
        assert_eq!(holding.shares, Some(dec!(200)));
        // (200 * 1.6 + 0.60) / 200
        assert_eq!(holding.cost_price, Some(dec!(1.603)));
        assert_eq!(holding.profit, Some(dec!(-0.60)));
    }

    #[test]
    fn test_edit_replaces_running_position() {
        let ops = vec![
            buy(dec!(1000), Some(dec!(1.0)), Decimal::ZERO, "2024-05-06"),
            edit(
                Holding::by_amount(CODE, dec!(600), dec!(100)).with_first_buy(Some(d("2024-01-02"))),
                "2024-05-08",
            ),
        ];

        let holding = reconcile(CODE, &ops, dec!(1.2)).unwrap();
        assert_eq!(holding.shares, Some(dec!(500)));
        assert_eq!(holding.cost_price, Some(dec!(1.0)));
        // First buy was already known from the add.
        assert_eq!(holding.first_buy, Some(d("2024-05-06")));
    }

    #[test]
    fn test_edit_to_nothing_clears_holding() {
        let ops = vec![
            buy(dec!(1000), Some(dec!(1.0)), Decimal::ZERO, "2024-05-06"),
            op(OperationKind::Edit, "2024-05-08", None),
        ];

        assert_eq!(reconcile(CODE, &ops, dec!(1.0)), None);
    }

    #[test]
    fn test_baseline_seeds_the_replay() {
        let baseline = Holding::by_shares(CODE, dec!(100), dec!(1.0)).with_first_buy(Some(d("2023-12-01")));
        let ops = vec![buy(dec!(110), Some(dec!(1.1)), Decimal::ZERO, "2024-05-10")];

        let holding = reconcile_from(CODE, Some(&baseline), &ops, dec!(1.1)).unwrap();
        assert_eq!(holding.shares, Some(dec!(200)));
        assert_eq!(holding.cost_price, Some(dec!(1.05)));
        assert_eq!(holding.first_buy, Some(d("2023-12-01")));
        assert_ne!(
            reconcile_key(Some(&baseline), &ops, dec!(1.1)),
            reconcile_key(None, &ops, dec!(1.1))
        );
    }

    #[test]
    fn test_other_funds_are_ignored() {
        let mut other = buy(dec!(1000), Some(dec!(1.0)), Decimal::ZERO, "2024-05-06");
        other.code = "161725".to_string();

        assert_eq!(reconcile(CODE, &[other], dec!(1.0)), None);
    }

    #[test]
    fn test_key_tracks_status_and_nav() {
        let mut ops = vec![buy(dec!(1000), None, Decimal::ZERO, "2024-05-10")];
        let before = reconcile_key(None, &ops, dec!(1.0));

        ops[0].backfill_nav(dec!(1.01));
        let after_backfill = reconcile_key(None, &ops, dec!(1.0));
        assert_ne!(before, after_backfill);

        assert_ne!(after_backfill, reconcile_key(None, &ops, dec!(1.02)));
    }
}
