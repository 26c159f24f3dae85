//! Static tier: a small built-in catalog that always answers.

use serde_json::Value;

use super::{Capability, ResolvedData};
use crate::models::{Cart, Money, Product};

#[derive(Debug, Clone)]
pub struct StaticCatalog {
    products: Vec<Product>,
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticCatalog {
    pub const NAME: &'static str = "static-fallback";

    pub fn new() -> Self {
        Self {
            products: vec![
                Product {
                    id: "OLJCESPC7Z".to_string(),
                    name: "Sunglasses".to_string(),
                    description: "Add a modern touch to your outfits with these sleek aviator sunglasses.".to_string(),
                    picture: "/static/img/products/sunglasses.jpg".to_string(),
                    price_usd: Money::usd(19, 990_000_000),
                    categories: vec!["accessories".to_string()],
                },
                Product {
                    id: "66VCHSJNUP".to_string(),
                    name: "Tank Top".to_string(),
                    description: "Perfectly cropped cotton tank, with a scooped neckline.".to_string(),
                    picture: "/static/img/products/tank-top.jpg".to_string(),
                    price_usd: Money::usd(18, 990_000_000),
                    categories: vec!["clothing".to_string(), "tops".to_string()],
                },
                Product {
                    id: "1YMWWN1N4O".to_string(),
                    name: "Watch".to_string(),
                    description: "This gold-tone stainless steel watch will work with most of your outfits.".to_string(),
                    picture: "/static/img/products/watch.jpg".to_string(),
                    price_usd: Money::usd(109, 990_000_000),
                    categories: vec!["accessories".to_string()],
                },
            ],
        }
    }

    pub fn products(&self) -> Vec<Product> {
        self.products.clone()
    }

    pub fn resolve(&self, capability: Capability, params: &Value) -> ResolvedData {
        match capability {
            Capability::ListProducts => ResolvedData::Products(self.products()),
            Capability::GetProduct => {
                let id = params.get("product_id").and_then(|v| v.as_str()).unwrap_or("");
                ResolvedData::Product(self.products.iter().find(|p| p.id == id).cloned())
            }
            Capability::GetCart => {
                let user = params.get("user_id").and_then(|v| v.as_str()).unwrap_or("anonymous");
                ResolvedData::Cart(Cart::empty(user))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_product_by_id() {
        let catalog = StaticCatalog::new();
        let found = catalog.resolve(
            Capability::GetProduct,
            &serde_json::json!({ "product_id": "1YMWWN1N4O" }),
        );
        match found {
            ResolvedData::Product(Some(p)) => assert_eq!(p.name, "Watch"),
            other => panic!("unexpected: {:?}", other),
        }

        let missing = catalog.resolve(
            Capability::GetProduct,
            &serde_json::json!({ "product_id": "nope" }),
        );
        assert_eq!(missing, ResolvedData::Product(None));
    }

    #[test]
    fn test_cart_is_empty_for_user() {
        let catalog = StaticCatalog::new();
        let cart = catalog.resolve(Capability::GetCart, &serde_json::json!({ "user_id": "u1" }));
        assert_eq!(cart, ResolvedData::Cart(Cart::empty("u1")));
    }
}
