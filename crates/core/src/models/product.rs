//! Catalog products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ProductId;
use crate::validation::{self, ValidationError};

const NAME_MIN: usize = 3;
const NAME_MAX: usize = 100;
const DESCRIPTION_MIN: usize = 10;

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert shape for [`Product`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock: i32,
}

impl NewProduct {
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::length("name", &self.name, NAME_MIN, Some(NAME_MAX))?;
        validation::length("description", &self.description, DESCRIPTION_MIN, None)?;
        validation::positive_amount("price", self.price)?;
        validation::non_negative_count("stock", self.stock)
    }
}

/// Partial update for [`Product`]. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub stock: Option<i32>,
}

impl ProductUpdate {
    /// Apply the [`NewProduct`] rules to every present field.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validation::length("name", name, NAME_MIN, Some(NAME_MAX))?;
        }
        if let Some(description) = &self.description {
            validation::length("description", description, DESCRIPTION_MIN, None)?;
        }
        if let Some(price) = self.price {
            validation::positive_amount("price", price)?;
        }
        if let Some(stock) = self.stock {
            validation::non_negative_count("stock", stock)?;
        }
        Ok(())
    }

    /// Copy every present field onto `product`. Does not touch `updated_at`.
    pub fn apply_to(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(image_url) = self.image_url {
            product.image_url = Some(image_url);
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
    }
}
