//! Pre-checkout cart held by the storefront client.
//!
//! The cart lives entirely on the client and is persisted to a small
//! key/value store under three independent keys, mirroring browser local
//! storage. Nothing here talks to the network or checks stock; the server only
//! ever sees the [`OrderDraft`] produced by [`CartState::order_draft`].

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entities::order::PaymentMethod;
use crate::services::orders::{OrderDraft, OrderItemInput, ShippingInfo};

pub const CART_ITEMS_KEY: &str = "cartItems";
pub const SHIPPING_INFO_KEY: &str = "shippingInfo";
pub const PAYMENT_METHOD_KEY: &str = "paymentMethod";

#[derive(Debug, Error)]
pub enum CartError {
    #[error("Cart storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Cart serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Shipping information has not been provided")]
    MissingShippingInfo,

    #[error("No payment method selected")]
    MissingPaymentMethod,
}

/// One cart line. `count_in_stock` is the stock figure seen when the product
/// was added and is only used by the client to cap the quantity picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub image: String,
    pub price: Decimal,
    pub quantity: i32,
    #[serde(default)]
    pub count_in_stock: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Replaces the line for the same product or appends a new one.
    /// The quantity is taken as given, never added to the existing one.
    AddItem(CartItem),
    RemoveItem(Uuid),
    Clear,
    SetShippingInfo(ShippingInfo),
    SetPaymentMethod(PaymentMethod),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    pub cart_items: Vec<CartItem>,
    pub shipping_info: Option<ShippingInfo>,
    pub payment_method: Option<PaymentMethod>,
}

impl CartState {
    pub fn apply(mut self, action: CartAction) -> CartState {
        match action {
            CartAction::AddItem(item) => {
                match self
                    .cart_items
                    .iter_mut()
                    .find(|existing| existing.product == item.product)
                {
                    Some(existing) => *existing = item,
                    None => self.cart_items.push(item),
                }
            }
            CartAction::RemoveItem(product) => {
                self.cart_items.retain(|item| item.product != product);
            }
            CartAction::Clear => self.cart_items.clear(),
            CartAction::SetShippingInfo(info) => self.shipping_info = Some(info),
            CartAction::SetPaymentMethod(method) => self.payment_method = Some(method),
        }
        self
    }

    /// Sum of price × quantity, rounded to cents.
    pub fn items_price(&self) -> Decimal {
        let raw: Decimal = self
            .cart_items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum();
        round_cents(raw)
    }

    pub fn item_count(&self) -> i64 {
        self.cart_items.iter().map(|item| i64::from(item.quantity)).sum()
    }

    /// Builds the checkout submission. Tax is `items × tax_rate` rounded to
    /// cents and the total is exactly `items + tax`.
    pub fn order_draft(&self, tax_rate: Decimal) -> Result<OrderDraft, CartError> {
        if self.cart_items.is_empty() {
            return Err(CartError::EmptyCart);
        }
        let shipping_info = self
            .shipping_info
            .clone()
            .ok_or(CartError::MissingShippingInfo)?;
        let payment_method = self.payment_method.ok_or(CartError::MissingPaymentMethod)?;

        let items_price = self.items_price();
        let tax_price = round_cents(items_price * tax_rate);

        Ok(OrderDraft {
            order_items: self
                .cart_items
                .iter()
                .map(|item| OrderItemInput {
                    product: item.product,
                    name: item.name.clone(),
                    slug: item.slug.clone(),
                    image: item.image.clone(),
                    price: item.price,
                    quantity: item.quantity,
                })
                .collect(),
            shipping_info,
            payment_method,
            items_price,
            tax_price,
            total_price: items_price + tax_price,
        })
    }
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// String key/value persistence in the shape of browser local storage.
pub trait CartStorage {
    fn get(&self, key: &str) -> Result<Option<String>, CartError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), CartError>;
    fn remove(&mut self, key: &str) -> Result<(), CartError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, CartError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), CartError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), CartError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// All keys in one JSON object on disk. A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<BTreeMap<String, String>, CartError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_document(&self, document: &BTreeMap<String, String>) -> Result<(), CartError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(document)?)?;
        Ok(())
    }
}

impl CartStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, CartError> {
        Ok(self.read_document()?.remove(key))
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), CartError> {
        let mut document = self.read_document()?;
        document.insert(key.to_string(), value);
        self.write_document(&document)
    }

    fn remove(&mut self, key: &str) -> Result<(), CartError> {
        let mut document = self.read_document()?;
        if document.remove(key).is_some() {
            self.write_document(&document)?;
        }
        Ok(())
    }
}

/// Cart state bound to its storage. Every dispatched action is persisted
/// before the new state is returned.
#[derive(Debug)]
pub struct CartStore<S: CartStorage> {
    storage: S,
    state: CartState,
}

impl<S: CartStorage> CartStore<S> {
    /// Restores the cart at session start. Unreadable keys fall back to
    /// their empty value.
    pub fn load(storage: S) -> Result<Self, CartError> {
        let state = CartState {
            cart_items: read_key(&storage, CART_ITEMS_KEY)?.unwrap_or_default(),
            shipping_info: read_key(&storage, SHIPPING_INFO_KEY)?,
            payment_method: read_key(&storage, PAYMENT_METHOD_KEY)?,
        };
        debug!(items = state.cart_items.len(), "Cart restored");
        Ok(Self { storage, state })
    }

    pub fn state(&self) -> &CartState {
        &self.state
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn dispatch(&mut self, action: CartAction) -> Result<&CartState, CartError> {
        let persist = match &action {
            CartAction::AddItem(_) | CartAction::RemoveItem(_) => Persist::Items,
            CartAction::Clear => Persist::EraseItems,
            CartAction::SetShippingInfo(_) => Persist::Shipping,
            CartAction::SetPaymentMethod(_) => Persist::Payment,
        };

        let next = self.state.clone().apply(action);
        match persist {
            Persist::Items => self
                .storage
                .set(CART_ITEMS_KEY, serde_json::to_string(&next.cart_items)?)?,
            Persist::EraseItems => self.storage.remove(CART_ITEMS_KEY)?,
            Persist::Shipping => self
                .storage
                .set(SHIPPING_INFO_KEY, serde_json::to_string(&next.shipping_info)?)?,
            Persist::Payment => self
                .storage
                .set(PAYMENT_METHOD_KEY, serde_json::to_string(&next.payment_method)?)?,
        }
        self.state = next;
        Ok(&self.state)
    }

    /// Forgets everything the session collected.
    pub fn logout(&mut self) -> Result<(), CartError> {
        self.storage.remove(CART_ITEMS_KEY)?;
        self.storage.remove(SHIPPING_INFO_KEY)?;
        self.storage.remove(PAYMENT_METHOD_KEY)?;
        self.state = CartState::default();
        Ok(())
    }

    pub fn into_storage(self) -> S {
        self.storage
    }
}

enum Persist {
    Items,
    EraseItems,
    Shipping,
    Payment,
}

fn read_key<T: DeserializeOwned, S: CartStorage>(
    storage: &S,
    key: &str,
) -> Result<Option<T>, CartError> {
    let Some(raw) = storage.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str::<Option<T>>(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!(key, error = %e, "Discarding unreadable cart entry");
            Ok(None)
        }
    }
}
