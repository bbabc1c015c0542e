use serde::{Deserialize, Serialize};

use crate::models::checkout_intent::{AdminCredential, AdminUser};
use crate::models::plan::{BillingInterval, Plan, FREE_TIER_MAX_APARTMENTS};

const SUBDOMAIN_MIN_LEN: usize = 3;
const SUBDOMAIN_MAX_LEN: usize = 63;

/// Body of `POST /checkout-sessions`.
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionPayload {
    pub plan: String,
    pub apartments: u32,
    pub billing_interval: BillingInterval,
    pub subdomain: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub oauth: bool,
}

/// Body of `POST /signup/free`.
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeSignupPayload {
    pub apartments: u32,
    pub subdomain: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub oauth: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupValidationError {
    /// The plan/unit-count combination is not allowed.
    Plan(String),
    /// Any other malformed field.
    Field(String),
}

/// Lowercases and checks a tenant subdomain: 3-63 chars of `[a-z0-9-]`, no
/// leading or trailing hyphen.
pub fn normalize_subdomain(raw: &str) -> Result<String, SignupValidationError> {
    let subdomain = raw.trim().to_lowercase();
    let len = subdomain.len();
    if !(SUBDOMAIN_MIN_LEN..=SUBDOMAIN_MAX_LEN).contains(&len) {
        return Err(SignupValidationError::Field(format!(
            "Subdomain must be between {} and {} characters",
            SUBDOMAIN_MIN_LEN, SUBDOMAIN_MAX_LEN
        )));
    }
    if !subdomain
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(SignupValidationError::Field(
            "Subdomain may only contain letters, digits and hyphens".into(),
        ));
    }
    if subdomain.starts_with('-') || subdomain.ends_with('-') {
        return Err(SignupValidationError::Field(
            "Subdomain cannot start or end with a hyphen".into(),
        ));
    }
    Ok(subdomain)
}

fn normalize_email(raw: &str) -> Result<String, SignupValidationError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(SignupValidationError::Field("Invalid email address".into())),
    }
}

fn required(value: &str, label: &str) -> Result<String, SignupValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SignupValidationError::Field(format!("{} is required", label)));
    }
    Ok(trimmed.to_string())
}

fn admin_user(
    email: &str,
    first_name: &str,
    last_name: &str,
    password: Option<&str>,
    oauth: bool,
) -> Result<AdminUser, SignupValidationError> {
    let credential = if oauth {
        AdminCredential::OAuth
    } else {
        match password.filter(|p| !p.is_empty()) {
            Some(p) => AdminCredential::Password(p.to_string()),
            None => {
                return Err(SignupValidationError::Field(
                    "Password is required unless signing in with an identity provider".into(),
                ))
            }
        }
    };
    Ok(AdminUser {
        email: normalize_email(email)?,
        first_name: required(first_name, "First name")?,
        last_name: required(last_name, "Last name")?,
        credential,
    })
}

/// Free-plan ceiling check shared by checkout and direct signup.
pub fn check_plan_units(plan: Plan, apartments: u32) -> Result<(), SignupValidationError> {
    if apartments == 0 {
        return Err(SignupValidationError::Field(
            "Apartment count must be at least 1".into(),
        ));
    }
    if plan.is_free() && apartments > FREE_TIER_MAX_APARTMENTS {
        return Err(SignupValidationError::Plan(format!(
            "The free plan supports at most {} apartments",
            FREE_TIER_MAX_APARTMENTS
        )));
    }
    Ok(())
}

/// Validated form of [`CheckoutSessionPayload`].
#[derive(Debug, Clone)]
pub struct ValidatedCheckout {
    pub plan: Plan,
    pub apartments: u32,
    pub billing_interval: BillingInterval,
    pub subdomain: String,
    pub admin: AdminUser,
}

impl CheckoutSessionPayload {
    pub fn validate(&self) -> Result<ValidatedCheckout, SignupValidationError> {
        let plan = self
            .plan
            .parse::<Plan>()
            .map_err(|e| SignupValidationError::Plan(e.to_string()))?;
        check_plan_units(plan, self.apartments)?;
        Ok(ValidatedCheckout {
            plan,
            apartments: self.apartments,
            billing_interval: self.billing_interval,
            subdomain: normalize_subdomain(&self.subdomain)?,
            admin: admin_user(
                &self.email,
                &self.first_name,
                &self.last_name,
                self.password.as_deref(),
                self.oauth,
            )?,
        })
    }
}

impl FreeSignupPayload {
    pub fn validate(&self) -> Result<(String, AdminUser), SignupValidationError> {
        check_plan_units(Plan::Free, self.apartments)?;
        let subdomain = normalize_subdomain(&self.subdomain)?;
        let admin = admin_user(
            &self.email,
            &self.first_name,
            &self.last_name,
            self.password.as_deref(),
            self.oauth,
        )?;
        Ok((subdomain, admin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkout(plan: &str, apartments: u32) -> CheckoutSessionPayload {
        CheckoutSessionPayload {
            plan: plan.into(),
            apartments,
            billing_interval: BillingInterval::Month,
            subdomain: "Acme".into(),
            email: " Owner@Acme.test ".into(),
            first_name: "Ana".into(),
            last_name: "Horvat".into(),
            password: Some("pw".into()),
            oauth: false,
        }
    }

    #[test]
    fn subdomain_rules() {
        assert_eq!(normalize_subdomain(" Acme-1 ").unwrap(), "acme-1");
        assert!(normalize_subdomain("ab").is_err());
        assert!(normalize_subdomain("-acme").is_err());
        assert!(normalize_subdomain("acme-").is_err());
        assert!(normalize_subdomain("ac_me").is_err());
        assert!(normalize_subdomain(&"a".repeat(64)).is_err());
    }

    #[test]
    fn free_plan_ceiling_is_seven_units() {
        assert!(check_plan_units(Plan::Free, 7).is_ok());
        assert!(matches!(
            check_plan_units(Plan::Free, 8),
            Err(SignupValidationError::Plan(_))
        ));
        assert!(check_plan_units(Plan::Web, 8).is_ok());
        assert!(matches!(
            check_plan_units(Plan::Web, 0),
            Err(SignupValidationError::Field(_))
        ));
    }

    #[test]
    fn checkout_payload_normalizes_fields() {
        let validated = checkout("premium", 20).validate().unwrap();
        assert_eq!(validated.plan, Plan::Premium);
        assert_eq!(validated.subdomain, "acme");
        assert_eq!(validated.admin.email, "owner@acme.test");
        assert_eq!(
            validated.admin.credential,
            AdminCredential::Password("pw".into())
        );
    }

    #[test]
    fn unknown_plan_is_a_plan_error() {
        assert!(matches!(
            checkout("platinum", 5).validate(),
            Err(SignupValidationError::Plan(_))
        ));
    }

    #[test]
    fn oauth_checkout_needs_no_password() {
        let mut payload = checkout("web", 10);
        payload.password = None;
        assert!(payload.validate().is_err());
        payload.oauth = true;
        let validated = payload.validate().unwrap();
        assert!(validated.admin.credential.is_oauth());
    }

    #[test]
    fn checkout_payload_deserializes_camel_case() {
        let payload: CheckoutSessionPayload = serde_json::from_value(serde_json::json!({
            "plan": "premium",
            "apartments": 20,
            "billingInterval": "year",
            "subdomain": "acme",
            "email": "owner@acme.test",
            "firstName": "Ana",
            "lastName": "Horvat",
            "oauth": true
        }))
        .unwrap();
        assert_eq!(payload.billing_interval, BillingInterval::Year);
        assert!(payload.password.is_none());
    }
}
