//! Entry types for carts and wishlists.

use crate::ProductId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

/// Size used when a product is added to the cart without one.
pub const DEFAULT_SIZE: &str = "One Size";

/// School label used when a product does not name its school.
pub const DEFAULT_SCHOOL: &str = "School Uniform";

/// Which collection an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Cart,
    Wishlist,
}

impl EntryKind {
    /// Canonical lowercase name, used for storage keys and subcollections.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Cart => "cart",
            EntryKind::Wishlist => "wishlist",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviour shared by cart lines and wishlist entries.
///
/// Stores only ever hold one entry per [`Entry::product_id`]. What happens
/// when the same product is inserted twice is decided by [`Entry::absorb`].
pub trait Entry: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The collection this entry type lives in.
    const KIND: EntryKind;

    /// Product identifier, unique within one store.
    fn product_id(&self) -> &str;

    /// Quantity, if the entry kind has one.
    fn quantity(&self) -> Option<u32>;

    /// Fold a second insertion of the same product into `self`.
    ///
    /// Returns `true` when `self` changed and has to be written back.
    fn absorb(&mut self, incoming: &Self) -> bool;

    /// Overwrite the quantity. Returns `false` for entry kinds without one.
    fn set_quantity(&mut self, quantity: u32) -> bool;

    /// Fill in the creation timestamp if it is missing.
    fn mark_added(&mut self, at: DateTime<Utc>);

    /// Enforce the entry's own invariants before it is stored.
    fn normalize(&mut self) {}
}

fn default_quantity() -> u32 {
    1
}

fn default_size() -> String {
    DEFAULT_SIZE.to_string()
}

/// A product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product identifier
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Unit price
    pub price: Decimal,
    /// Selected size
    #[serde(default = "default_size")]
    pub size: String,
    /// Number of units, never 0 once stored
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Label of the school the product belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_name: Option<String>,
    /// When the line was first added
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    /// When the quantity last changed (remote only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CartLine {
    /// Create a cart line without image, school or timestamps.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Decimal,
        size: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            size: size.into(),
            quantity,
            image: None,
            school_name: None,
            added_at: None,
            updated_at: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_school(mut self, school_name: impl Into<String>) -> Self {
        self.school_name = Some(school_name.into());
        self
    }

    /// Price of the whole line.
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

impl Entry for CartLine {
    const KIND: EntryKind = EntryKind::Cart;

    fn product_id(&self) -> &str {
        &self.id
    }

    fn quantity(&self) -> Option<u32> {
        Some(self.quantity)
    }

    fn absorb(&mut self, incoming: &Self) -> bool {
        self.quantity = self.quantity.saturating_add(incoming.quantity.max(1));
        true
    }

    fn set_quantity(&mut self, quantity: u32) -> bool {
        self.quantity = quantity;
        true
    }

    fn mark_added(&mut self, at: DateTime<Utc>) {
        self.added_at.get_or_insert(at);
    }

    fn normalize(&mut self) {
        if self.quantity == 0 {
            self.quantity = 1;
        }
    }
}

/// A product saved to a wishlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    /// Product identifier
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Price at the time it was saved
    pub price: Decimal,
    /// Image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// When the entry was added
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl WishlistEntry {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            image: None,
            added_at: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Build a single-unit cart line for this product.
    ///
    /// Falls back to [`DEFAULT_SIZE`] and [`DEFAULT_SCHOOL`].
    pub fn to_cart_line(&self, size: Option<&str>) -> CartLine {
        CartLine {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            size: size.unwrap_or(DEFAULT_SIZE).to_string(),
            quantity: 1,
            image: self.image.clone(),
            school_name: Some(DEFAULT_SCHOOL.to_string()),
            added_at: None,
            updated_at: None,
        }
    }
}

impl Entry for WishlistEntry {
    const KIND: EntryKind = EntryKind::Wishlist;

    fn product_id(&self) -> &str {
        &self.id
    }

    fn quantity(&self) -> Option<u32> {
        None
    }

    fn absorb(&mut self, _incoming: &Self) -> bool {
        false
    }

    fn set_quantity(&mut self, _quantity: u32) -> bool {
        false
    }

    fn mark_added(&mut self, at: DateTime<Utc>) {
        self.added_at.get_or_insert(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blazer(quantity: u32) -> CartLine {
        CartLine::new("blazer", "Blazer", Decimal::new(4500, 2), "M", quantity)
    }

    #[test]
    fn cart_absorb_sums_quantities() {
        let mut line = blazer(2);
        assert!(line.absorb(&blazer(3)));
        assert_eq!(line.quantity, 5);
    }

    #[test]
    fn cart_absorb_counts_zero_as_one() {
        let mut line = blazer(2);
        line.absorb(&blazer(0));
        assert_eq!(line.quantity, 3);
    }

    #[test]
    fn wishlist_absorb_is_noop() {
        let mut entry = WishlistEntry::new("tie", "Tie", Decimal::new(999, 2));
        let other = WishlistEntry::new("tie", "Renamed", Decimal::new(1, 0));
        assert!(!entry.absorb(&other));
        assert_eq!(entry.name, "Tie");
        assert!(!entry.set_quantity(4));
        assert_eq!(entry.quantity(), None);
    }

    #[test]
    fn normalize_lifts_zero_quantity() {
        let mut line = blazer(0);
        line.normalize();
        assert_eq!(line.quantity, 1);
    }

    #[test]
    fn mark_added_keeps_existing_timestamp() {
        let first = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let later = DateTime::from_timestamp(1_800_000_000, 0).unwrap();

        let mut line = blazer(1);
        line.mark_added(first);
        line.mark_added(later);
        assert_eq!(line.added_at, Some(first));
    }

    #[test]
    fn cart_line_uses_camel_case_fields() {
        let line = blazer(1).with_school("Hillcrest");
        let value = serde_json::to_value(&line).unwrap();

        assert_eq!(value["schoolName"], "Hillcrest");
        assert_eq!(value["quantity"], 1);
        assert!(value.get("image").is_none());
        assert!(value.get("addedAt").is_none());
    }

    #[test]
    fn cart_line_accepts_numeric_price_and_missing_quantity() {
        let line: CartLine = serde_json::from_value(json!({
            "id": "shirt",
            "name": "Shirt",
            "price": 12.5,
            "size": "S"
        }))
        .unwrap();

        assert_eq!(line.price, Decimal::new(125, 1));
        assert_eq!(line.quantity, 1);
    }

    #[test]
    fn line_total_multiplies_price() {
        assert_eq!(blazer(3).line_total(), Decimal::new(13500, 2));
    }

    #[test]
    fn wishlist_entry_to_cart_line_defaults() {
        let entry = WishlistEntry::new("tie", "Tie", Decimal::new(999, 2)).with_image("tie.png");

        let line = entry.to_cart_line(None);
        assert_eq!(line.size, DEFAULT_SIZE);
        assert_eq!(line.quantity, 1);
        assert_eq!(line.school_name.as_deref(), Some(DEFAULT_SCHOOL));
        assert_eq!(line.image.as_deref(), Some("tie.png"));

        let sized = entry.to_cart_line(Some("L"));
        assert_eq!(sized.size, "L");
    }

    #[test]
    fn kind_names() {
        assert_eq!(EntryKind::Cart.to_string(), "cart");
        assert_eq!(EntryKind::Wishlist.as_str(), "wishlist");
    }
}
