use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest building (in apartment units) the free plan may host.
pub const FREE_TIER_MAX_APARTMENTS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Free,
    Web,
    Premium,
    PremiumIot,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Web => "web",
            Plan::Premium => "premium",
            Plan::PremiumIot => "premium_iot",
        }
    }

    /// Identifier the core tenant API uses for this tier.
    pub fn internal_id(&self) -> i32 {
        match self {
            Plan::Free => 1,
            Plan::Web => 2,
            Plan::Premium => 3,
            Plan::PremiumIot => 4,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Plan::Free => "Free",
            Plan::Web => "Web",
            Plan::Premium => "Premium",
            Plan::PremiumIot => "Premium IoT",
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Plan::Free)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPlan(pub String);

impl fmt::Display for UnknownPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown plan '{}'", self.0)
    }
}

impl std::error::Error for UnknownPlan {}

impl FromStr for Plan {
    type Err = UnknownPlan;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "web" => Ok(Plan::Web),
            "premium" => Ok(Plan::Premium),
            "premium_iot" | "premium-iot" => Ok(Plan::PremiumIot),
            _ => Err(UnknownPlan(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Month,
    Year,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Month => "month",
            BillingInterval::Year => "year",
        }
    }
}

impl FromStr for BillingInterval {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "month" | "monthly" => Ok(BillingInterval::Month),
            "year" | "yearly" | "annual" => Ok(BillingInterval::Year),
            other => Err(format!("unknown billing interval '{}'", other)),
        }
    }
}
