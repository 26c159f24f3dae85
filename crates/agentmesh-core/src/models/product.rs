//! Catalog data returned by the resolver chain.
//!
//! Field names follow the wire format of the catalog and cart services
//! (snake_case), not the camelCase used by our own API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Money {
    pub currency_code: String,
    #[serde(default)]
    pub units: i64,
    #[serde(default)]
    pub nanos: i32,
}

impl Money {
    pub fn usd(units: i64, nanos: i32) -> Self {
        Self {
            currency_code: "USD".to_string(),
            units,
            nanos,
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.units as f64 + f64::from(self.nanos) / 1_000_000_000.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub picture: String,
    #[serde(alias = "price")]
    pub price_usd: Money,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    pub user_id: String,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            items: Vec::new(),
        }
    }

    /// Total quantity across items, saturating at `u32::MAX`.
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |total, item| total.saturating_add(item.quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_as_f64() {
        let price = Money::usd(19, 990_000_000);
        assert!((price.as_f64() - 19.99).abs() < 1e-9);
    }

    #[test]
    fn test_product_accepts_price_alias() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": "OLJCESPC7Z",
            "name": "Sunglasses",
            "price": { "currency_code": "USD", "units": 19, "nanos": 990000000 }
        }))
        .unwrap();
        assert_eq!(product.price_usd.units, 19);
        assert!(product.categories.is_empty());
    }

    #[test]
    fn test_item_count_saturates_on_huge_quantities() {
        let cart: Cart = serde_json::from_value(serde_json::json!({
            "user_id": "u1",
            "items": [
                { "product_id": "A", "quantity": u32::MAX },
                { "product_id": "B", "quantity": 1 },
                { "product_id": "C" }
            ]
        }))
        .unwrap();
        assert_eq!(cart.item_count(), u32::MAX);
        assert_eq!(Cart::empty("u2").item_count(), 0);
    }
}
