use serde::{Deserialize, Serialize};

/// Initial administrator sent with `POST /tenants`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantAdmin {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl std::fmt::Debug for TenantAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantAdmin")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Payment-processor identifiers kept on the tenant for billing reconciliation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessorRefs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_checkout_session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateTenantRequest {
    pub subdomain: String,
    pub user: TenantAdmin,
    pub plan_id: i32,
    #[serde(flatten)]
    pub processor: ProcessorRefs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedTenant {
    pub tenant_id: String,
    /// Present when the core API created a fresh administrator account.
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantSummary {
    pub id: String,
    pub subdomain: String,
    #[serde(default)]
    pub stripe_checkout_session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_flattens_processor_refs() {
        let req = CreateTenantRequest {
            subdomain: "acme".into(),
            user: TenantAdmin {
                email: "owner@acme.test".into(),
                first_name: "Ana".into(),
                last_name: "Horvat".into(),
                password: "pw".into(),
            },
            plan_id: 3,
            processor: ProcessorRefs {
                stripe_customer_id: Some("cus_1".into()),
                stripe_subscription_id: None,
                stripe_checkout_session_id: Some("cs_1".into()),
            },
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["stripe_customer_id"], json!("cus_1"));
        assert_eq!(value["stripe_checkout_session_id"], json!("cs_1"));
        assert!(value.get("stripe_subscription_id").is_none());
        assert_eq!(value["user"]["email"], json!("owner@acme.test"));
    }

    #[test]
    fn admin_debug_hides_password() {
        let admin = TenantAdmin {
            email: "a@b.c".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            password: "topsecret".into(),
        };
        assert!(!format!("{:?}", admin).contains("topsecret"));
    }
}
