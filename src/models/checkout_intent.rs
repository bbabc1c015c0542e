use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::models::plan::{BillingInterval, Plan};

pub const META_PLAN: &str = "plan";
pub const META_APARTMENTS: &str = "apartments";
pub const META_BILLING_INTERVAL: &str = "billing_interval";
pub const META_SUBDOMAIN: &str = "subdomain";
pub const META_EMAIL: &str = "email";
pub const META_FIRST_NAME: &str = "first_name";
pub const META_LAST_NAME: &str = "last_name";
pub const META_PASSWORD: &str = "password";
pub const META_OAUTH: &str = "oauth";

/// How the prospective administrator will sign in.
#[derive(Clone, PartialEq, Eq)]
pub enum AdminCredential {
    Password(String),
    /// Authenticated with a third-party identity provider; no password is carried.
    OAuth,
}

impl AdminCredential {
    pub fn is_oauth(&self) -> bool {
        matches!(self, AdminCredential::OAuth)
    }
}

impl fmt::Debug for AdminCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminCredential::Password(_) => f.write_str("Password(<redacted>)"),
            AdminCredential::OAuth => f.write_str("OAuth"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub credential: AdminCredential,
}

/// Everything needed to provision a tenant once checkout completes. Travels
/// only inside the checkout session's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutIntent {
    pub plan: Plan,
    pub apartments: u32,
    pub billing_interval: BillingInterval,
    pub subdomain: String,
    pub admin: AdminUser,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("checkout metadata is missing required field '{0}'")]
    Missing(&'static str),
    #[error("checkout metadata field '{field}' has invalid value '{value}'")]
    Invalid { field: &'static str, value: String },
}

impl CheckoutIntent {
    pub fn to_metadata(&self) -> BTreeMap<String, String> {
        let mut meta = BTreeMap::new();
        meta.insert(META_PLAN.to_string(), self.plan.as_str().to_string());
        meta.insert(META_APARTMENTS.to_string(), self.apartments.to_string());
        meta.insert(
            META_BILLING_INTERVAL.to_string(),
            self.billing_interval.as_str().to_string(),
        );
        meta.insert(META_SUBDOMAIN.to_string(), self.subdomain.clone());
        meta.insert(META_EMAIL.to_string(), self.admin.email.clone());
        meta.insert(META_FIRST_NAME.to_string(), self.admin.first_name.clone());
        meta.insert(META_LAST_NAME.to_string(), self.admin.last_name.clone());
        match &self.admin.credential {
            AdminCredential::Password(password) => {
                meta.insert(META_OAUTH.to_string(), "false".to_string());
                meta.insert(META_PASSWORD.to_string(), password.clone());
            }
            AdminCredential::OAuth => {
                meta.insert(META_OAUTH.to_string(), "true".to_string());
            }
        }
        meta
    }

    /// Metadata for the long-lived subscription object: everything except the
    /// admin password, which only the short-lived session may carry.
    pub fn to_subscription_metadata(&self) -> BTreeMap<String, String> {
        let mut meta = self.to_metadata();
        meta.remove(META_PASSWORD);
        meta
    }

    /// Rebuilds the intent from the string map the processor echoes back.
    /// `subdomain`, `plan` and `email` are mandatory; the remaining fields
    /// fall back to defaults when absent.
    pub fn from_metadata<'a, I>(entries: I) -> Result<Self, MetadataError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let meta: BTreeMap<&str, &str> = entries
            .into_iter()
            .map(|(k, v)| (k, v.trim()))
            .filter(|(_, v)| !v.is_empty())
            .collect();

        let subdomain = meta
            .get(META_SUBDOMAIN)
            .ok_or(MetadataError::Missing(META_SUBDOMAIN))?
            .to_lowercase();
        let raw_plan = meta
            .get(META_PLAN)
            .ok_or(MetadataError::Missing(META_PLAN))?;
        let email = meta
            .get(META_EMAIL)
            .ok_or(MetadataError::Missing(META_EMAIL))?
            .to_lowercase();

        let plan = raw_plan.parse::<Plan>().map_err(|_| MetadataError::Invalid {
            field: META_PLAN,
            value: raw_plan.to_string(),
        })?;

        let apartments = match meta.get(META_APARTMENTS) {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| MetadataError::Invalid {
                    field: META_APARTMENTS,
                    value: raw.to_string(),
                })?,
            None => 1,
        };

        let billing_interval = match meta.get(META_BILLING_INTERVAL) {
            Some(raw) => raw
                .parse::<BillingInterval>()
                .map_err(|_| MetadataError::Invalid {
                    field: META_BILLING_INTERVAL,
                    value: raw.to_string(),
                })?,
            None => BillingInterval::Month,
        };

        let oauth = meta
            .get(META_OAUTH)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let credential = if oauth {
            AdminCredential::OAuth
        } else {
            let password = meta
                .get(META_PASSWORD)
                .ok_or(MetadataError::Missing(META_PASSWORD))?;
            AdminCredential::Password(password.to_string())
        };

        Ok(CheckoutIntent {
            plan,
            apartments,
            billing_interval,
            subdomain,
            admin: AdminUser {
                email,
                first_name: meta.get(META_FIRST_NAME).unwrap_or(&"").to_string(),
                last_name: meta.get(META_LAST_NAME).unwrap_or(&"").to_string(),
                credential,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(credential: AdminCredential) -> CheckoutIntent {
        CheckoutIntent {
            plan: Plan::Premium,
            apartments: 20,
            billing_interval: BillingInterval::Year,
            subdomain: "acme".into(),
            admin: AdminUser {
                email: "owner@acme.test".into(),
                first_name: "Ana".into(),
                last_name: "Kovač".into(),
                credential,
            },
        }
    }

    fn entries(meta: &BTreeMap<String, String>) -> Vec<(&str, &str)> {
        meta.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    #[test]
    fn oauth_intent_omits_password_and_sets_flag() {
        let meta = intent(AdminCredential::OAuth).to_metadata();
        assert_eq!(meta.get(META_OAUTH).map(String::as_str), Some("true"));
        assert!(!meta.contains_key(META_PASSWORD));

        let parsed = CheckoutIntent::from_metadata(entries(&meta)).unwrap();
        assert_eq!(parsed.admin.credential, AdminCredential::OAuth);
    }

    #[test]
    fn password_intent_survives_metadata_boundary() {
        let original = intent(AdminCredential::Password("s3cret!".into()));
        let meta = original.to_metadata();
        assert_eq!(meta.get(META_OAUTH).map(String::as_str), Some("false"));
        assert_eq!(meta.get(META_PLAN).map(String::as_str), Some("premium"));
        assert_eq!(meta.get(META_APARTMENTS).map(String::as_str), Some("20"));
        assert_eq!(
            meta.get(META_BILLING_INTERVAL).map(String::as_str),
            Some("year")
        );

        let parsed = CheckoutIntent::from_metadata(entries(&meta)).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn missing_required_fields_are_reported_by_name() {
        let err = CheckoutIntent::from_metadata(vec![("plan", "web"), ("email", "a@b.c")])
            .unwrap_err();
        assert_eq!(err, MetadataError::Missing(META_SUBDOMAIN));

        let err = CheckoutIntent::from_metadata(vec![("subdomain", "acme"), ("email", "a@b.c")])
            .unwrap_err();
        assert_eq!(err, MetadataError::Missing(META_PLAN));

        let err = CheckoutIntent::from_metadata(vec![("subdomain", "acme"), ("plan", "web")])
            .unwrap_err();
        assert_eq!(err, MetadataError::Missing(META_EMAIL));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = CheckoutIntent::from_metadata(vec![
            ("subdomain", "  "),
            ("plan", "web"),
            ("email", "a@b.c"),
        ])
        .unwrap_err();
        assert_eq!(err, MetadataError::Missing(META_SUBDOMAIN));
    }

    #[test]
    fn non_oauth_intent_without_password_is_rejected() {
        let err = CheckoutIntent::from_metadata(vec![
            ("subdomain", "acme"),
            ("plan", "web"),
            ("email", "a@b.c"),
            ("oauth", "false"),
        ])
        .unwrap_err();
        assert_eq!(err, MetadataError::Missing(META_PASSWORD));
    }

    #[test]
    fn unknown_plan_is_invalid() {
        let err = CheckoutIntent::from_metadata(vec![
            ("subdomain", "acme"),
            ("plan", "gold"),
            ("email", "a@b.c"),
            ("oauth", "true"),
        ])
        .unwrap_err();
        assert!(matches!(err, MetadataError::Invalid { field: "plan", .. }));
    }

    #[test]
    fn debug_output_redacts_password() {
        let rendered = format!("{:?}", intent(AdminCredential::Password("hunter2".into())));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
