use crate::models::plan::{BillingInterval, Plan};

/// Currency every price below is expressed in (minor units).
pub const PRICE_CURRENCY: &str = "eur";

/// Yearly billing charges ten months for twelve.
pub const YEARLY_BILLED_MONTHS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rate {
    per_unit: i64,
    minimum: i64,
}

fn rate_for(plan: Plan) -> Rate {
    match plan {
        Plan::Free => Rate {
            per_unit: 0,
            minimum: 0,
        },
        Plan::Web => Rate {
            per_unit: 100,
            minimum: 1_500,
        },
        Plan::Premium => Rate {
            per_unit: 200,
            minimum: 2_500,
        },
        Plan::PremiumIot => Rate {
            per_unit: 300,
            minimum: 4_000,
        },
    }
}

/// Monthly price in minor currency units for a building with `apartments` units.
pub fn monthly_price(plan: Plan, apartments: u32) -> i64 {
    let rate = rate_for(plan);
    (rate.per_unit * i64::from(apartments)).max(rate.minimum)
}

pub fn yearly_price(plan: Plan, apartments: u32) -> i64 {
    monthly_price(plan, apartments) * YEARLY_BILLED_MONTHS
}

pub fn price_for_interval(plan: Plan, apartments: u32, interval: BillingInterval) -> i64 {
    match interval {
        BillingInterval::Month => monthly_price(plan, apartments),
        BillingInterval::Year => yearly_price(plan, apartments),
    }
}
