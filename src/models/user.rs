//! Marketplace account model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OnTymError, Result};

/// Which side of the marketplace an account is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Supplier,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Buyer => f.write_str("buyer"),
            Role::Supplier => f.write_str("supplier"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndustrySize {
    Small,
    Medium,
    Large,
}

/// Industry scale a supplier serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplyScale {
    Small,
    Medium,
    Large,
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerProfile {
    pub size_of_industry: IndustrySize,
    #[serde(default)]
    pub products_expected: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierProfile {
    pub scale_served: SupplyScale,
    #[serde(default)]
    pub products_offered: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Role-specific account details. Exactly one shape per role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Profile {
    Buyer(BuyerProfile),
    Supplier(SupplierProfile),
}

impl Profile {
    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Profile::Buyer(_) => Role::Buyer,
            Profile::Supplier(_) => Role::Supplier,
        }
    }

    /// Check the fields the registration form marks as required
    pub fn validate(&self) -> Result<()> {
        match self {
            Profile::Buyer(buyer) => {
                if buyer.location.trim().is_empty() {
                    return Err(OnTymError::validation("buyer location is required"));
                }
                validate_product_names(&buyer.products_expected)
            }
            Profile::Supplier(supplier) => validate_product_names(&supplier.products_offered),
        }
    }
}

fn validate_product_names(names: &[String]) -> Result<()> {
    if names.iter().any(|name| name.trim().is_empty()) {
        return Err(OnTymError::validation("product names cannot be empty"));
    }
    Ok(())
}

/// Stored account record. The password hash never leaves the accounts service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn role(&self) -> Role {
        self.profile.role()
    }
}
