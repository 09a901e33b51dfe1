//! Cart line items and the ordered cart itself.
//!
//! A [`Cart`] is a list of [`LineItem`]s unique by product ID. New items go to
//! the front; items keep their position when their amount changes. Every
//! mutator enforces those rules, and deserialization runs the same checks so a
//! snapshot with duplicate IDs or zero amounts never becomes a `Cart`.

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::{Price, Product, ProductId};

/// One product entry in the cart, with quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: ProductId,
    pub title: String,
    pub price: Price,
    pub image: String,
    /// Quantity requested, always at least 1.
    pub amount: u32,
}

impl LineItem {
    /// A single unit of `product`, copying its display attributes.
    #[must_use]
    pub fn from_product(product: Product) -> Self {
        Self {
            id: product.id,
            title: product.title,
            price: product.price,
            image: product.image,
            amount: 1,
        }
    }

    /// `price × amount`.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.price.times(self.amount)
    }
}

/// Violations of the cart's uniqueness and quantity rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartItemError {
    #[error("product {0} is already in the cart")]
    Duplicate(ProductId),

    #[error("product {0} is not in the cart")]
    Missing(ProductId),

    #[error("product {0} has a zero amount")]
    ZeroAmount(ProductId),
}

/// Ordered sequence of line items, unique by product ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<LineItem>")]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Line items in display order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LineItem> {
        self.items.iter()
    }

    /// Look up the line item for a product.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.get(id).is_some()
    }

    /// Total number of units across all line items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.amount)).sum()
    }

    /// Sum of every line item's subtotal.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(LineItem::subtotal).sum()
    }

    /// Insert a new line item at the front.
    ///
    /// # Errors
    ///
    /// Fails if the product is already present or the amount is zero.
    pub fn prepend(&mut self, item: LineItem) -> Result<(), CartItemError> {
        if item.amount == 0 {
            return Err(CartItemError::ZeroAmount(item.id));
        }
        if self.contains(item.id) {
            return Err(CartItemError::Duplicate(item.id));
        }
        self.items.insert(0, item);
        Ok(())
    }

    /// Set the amount of an existing line item in place.
    ///
    /// # Errors
    ///
    /// Fails if the product is absent or `amount` is zero.
    pub fn set_amount(&mut self, id: ProductId, amount: u32) -> Result<(), CartItemError> {
        if amount == 0 {
            return Err(CartItemError::ZeroAmount(id));
        }
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(CartItemError::Missing(id))?;
        item.amount = amount;
        Ok(())
    }

    /// Remove a product's line item, returning it.
    ///
    /// # Errors
    ///
    /// Fails if the product is absent.
    pub fn remove(&mut self, id: ProductId) -> Result<LineItem, CartItemError> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(CartItemError::Missing(id))?;
        Ok(self.items.remove(index))
    }
}

impl TryFrom<Vec<LineItem>> for Cart {
    type Error = CartItemError;

    fn try_from(items: Vec<LineItem>) -> Result<Self, Self::Error> {
        let mut seen = std::collections::HashSet::with_capacity(items.len());
        for item in &items {
            if item.amount == 0 {
                return Err(CartItemError::ZeroAmount(item.id));
            }
            if !seen.insert(item.id) {
                return Err(CartItemError::Duplicate(item.id));
            }
        }
        Ok(Self { items })
    }
}

impl Serialize for Cart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn item(id: i32, amount: u32) -> LineItem {
        LineItem {
            id: ProductId::new(id),
            title: format!("Shoe {id}"),
            price: Price::new(Decimal::from(100)),
            image: format!("{id}.png"),
            amount,
        }
    }

    #[test]
    fn test_prepend_puts_new_items_first() {
        let mut cart = Cart::new();
        cart.prepend(item(1, 1)).unwrap();
        cart.prepend(item(2, 1)).unwrap();

        let ids: Vec<i32> = cart.iter().map(|i| i.id.as_i32()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_prepend_rejects_duplicates() {
        let mut cart = Cart::new();
        cart.prepend(item(1, 1)).unwrap();

        assert_eq!(
            cart.prepend(item(1, 3)),
            Err(CartItemError::Duplicate(ProductId::new(1)))
        );
        assert_eq!(cart.get(ProductId::new(1)).unwrap().amount, 1);
    }

    #[test]
    fn test_set_amount_keeps_position() {
        let mut cart = Cart::try_from(vec![item(2, 1), item(1, 1)]).unwrap();
        cart.set_amount(ProductId::new(1), 4).unwrap();

        assert_eq!(cart.items().last().unwrap().amount, 4);
        assert_eq!(
            cart.set_amount(ProductId::new(1), 0),
            Err(CartItemError::ZeroAmount(ProductId::new(1)))
        );
        assert_eq!(
            cart.set_amount(ProductId::new(9), 2),
            Err(CartItemError::Missing(ProductId::new(9)))
        );
    }

    #[test]
    fn test_remove() {
        let mut cart = Cart::try_from(vec![item(2, 1), item(1, 1)]).unwrap();

        assert_eq!(cart.remove(ProductId::new(2)).unwrap().id, ProductId::new(2));
        assert_eq!(cart.len(), 1);
        assert!(cart.remove(ProductId::new(2)).is_err());
    }

    #[test]
    fn test_totals() {
        let cart = Cart::try_from(vec![item(1, 2), item(2, 3)]).unwrap();

        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.total(), Price::new(Decimal::from(500)));
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let cart = Cart::try_from(vec![item(1, 1)]).unwrap();

        assert_eq!(
            serde_json::to_string(&cart).unwrap(),
            r#"[{"id":1,"title":"Shoe 1","price":100.0,"image":"1.png","amount":1}]"#
        );
    }

    #[test]
    fn test_deserialize_rejects_invalid_snapshots() {
        let duplicate = r#"[{"id":1,"title":"a","price":1,"image":"","amount":1},
                            {"id":1,"title":"a","price":1,"image":"","amount":2}]"#;
        assert!(serde_json::from_str::<Cart>(duplicate).is_err());

        let zero = r#"[{"id":1,"title":"a","price":1,"image":"","amount":0}]"#;
        assert!(serde_json::from_str::<Cart>(zero).is_err());

        let negative = r#"[{"id":1,"title":"a","price":1,"image":"","amount":-1}]"#;
        assert!(serde_json::from_str::<Cart>(negative).is_err());
    }
}
