use crate::{
    db::DbPool,
    entities::order::{
        self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
        PaymentMethod,
    },
    entities::order_item::{self, Entity as OrderItemEntity, Model as OrderItemModel},
    entities::user::{self, Entity as UserEntity},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func, Query},
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Upper bound on order ids bound into a single item lookup.
const ITEM_LOOKUP_BATCH: usize = 500;

/// One cart line as submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    /// Product reference, copied verbatim onto the order
    pub product: Uuid,
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(custom = "not_blank")]
    pub slug: String,
    #[serde(default)]
    pub image: String,
    /// Unit price
    #[validate(custom = "non_negative")]
    #[schema(value_type = String, example = "24.99")]
    pub price: Decimal,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
    #[validate(custom = "not_blank")]
    pub first_name: String,
    #[validate(custom = "not_blank")]
    pub last_name: String,
    #[validate(custom = "not_blank")]
    pub phone_number: String,
    #[validate(custom = "not_blank")]
    pub address: String,
    #[validate(custom = "not_blank")]
    pub city: String,
    #[validate(custom = "not_blank")]
    pub region: String,
    #[validate(custom = "not_blank")]
    pub zip: String,
}

/// Checkout submission. Prices are trusted as sent; only their shape is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub order_items: Vec<OrderItemInput>,
    pub shipping_info: ShippingInfo,
    pub payment_method: PaymentMethod,
    #[validate(custom = "non_negative")]
    #[schema(value_type = String, example = "100.00")]
    pub items_price: Decimal,
    #[validate(custom = "non_negative")]
    #[schema(value_type = String, example = "8.25")]
    pub tax_price: Decimal,
    #[validate(custom = "non_negative")]
    #[schema(value_type = String, example = "108.25")]
    pub total_price: Decimal,
}

impl OrderDraft {
    /// Field validation plus the nested items/shipping and the total invariant.
    pub fn check(&self) -> Result<(), ServiceError> {
        self.validate()?;
        self.shipping_info.validate()?;
        for item in &self.order_items {
            item.validate()?;
        }
        if self.items_price + self.tax_price != self.total_price {
            return Err(ServiceError::ValidationError(format!(
                "totalPrice {} must equal itemsPrice {} + taxPrice {}",
                self.total_price, self.items_price, self.tax_price
            )));
        }
        Ok(())
    }
}

/// Provider confirmation stored on a paid order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaymentResult {
    pub id: String,
    pub status: String,
    pub update_time: String,
    pub email_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product: Uuid,
    pub name: String,
    pub slug: String,
    pub image: String,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    /// Owner user id
    pub user: Uuid,
    /// Owner display name; filled by the admin listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub order_items: Vec<OrderItemResponse>,
    pub shipping_info: ShippingInfo,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_result: Option<PaymentResult>,
    #[schema(value_type = String)]
    pub items_price: Decimal,
    #[schema(value_type = String)]
    pub tax_price: Decimal,
    #[schema(value_type = String)]
    pub total_price: Decimal,
    pub is_paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    pub is_pickup_ready: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin listing page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminOrderPage {
    pub orders: Vec<OrderResponse>,
    pub pages: u64,
}

#[derive(Debug, Clone, Default)]
pub struct AdminOrderQuery {
    pub page: u64,
    pub limit: u64,
    pub search_term: Option<String>,
    pub pickup_ready: Option<bool>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be empty".into());
        return Err(err);
    }
    Ok(())
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("negative");
        err.message = Some("must not be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Order creation and read paths.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Persists a validated checkout draft for `owner`. Every call creates a new order.
    #[instrument(skip(self, draft), fields(owner = %owner, items = draft.order_items.len()))]
    pub async fn create_order(
        &self,
        owner: Uuid,
        draft: OrderDraft,
    ) -> Result<OrderResponse, ServiceError> {
        draft.check()?;

        let db = &*self.db_pool;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let shipping = draft.shipping_info;
        let order_model = OrderActiveModel {
            id: Set(order_id),
            user_id: Set(owner),
            shipping_first_name: Set(shipping.first_name),
            shipping_last_name: Set(shipping.last_name),
            shipping_phone_number: Set(shipping.phone_number),
            shipping_address: Set(shipping.address),
            shipping_city: Set(shipping.city),
            shipping_region: Set(shipping.region),
            shipping_zip: Set(shipping.zip),
            payment_method: Set(draft.payment_method),
            payment_result_id: Set(None),
            payment_result_status: Set(None),
            payment_result_update_time: Set(None),
            payment_result_email_address: Set(None),
            items_price: Set(draft.items_price),
            tax_price: Set(draft.tax_price),
            total_price: Set(draft.total_price),
            is_paid: Set(false),
            paid_at: Set(None),
            is_pickup_ready: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to create order in database");
            ServiceError::DatabaseError(e)
        })?;

        let mut items = Vec::with_capacity(draft.order_items.len());
        for (position, item) in draft.order_items.into_iter().enumerate() {
            let saved = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                position: Set(position as i32),
                product_id: Set(item.product),
                name: Set(item.name),
                slug: Set(item.slug),
                image: Set(item.image),
                price: Set(item.price),
                quantity: Set(item.quantity),
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to store order item");
                ServiceError::DatabaseError(e)
            })?;
            items.push(saved);
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order creation transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, total = %order_model.total_price, "Order created");
        Ok(model_to_response(order_model, items, None))
    }

    /// Fetches any order by id. Callers are authenticated but ownership is not checked.
    #[instrument(skip(self))]
    pub async fn get_order_by_id(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;
        let order = OrderEntity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to fetch order");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::not_found_order(order_id))?;

        let mut responses = self.attach_items(vec![order], &HashMap::new()).await?;
        responses
            .pop()
            .ok_or_else(|| ServiceError::InternalError("order vanished while loading".into()))
    }

    /// The caller's own orders, newest first.
    #[instrument(skip(self))]
    pub async fn get_own_orders(&self, owner: Uuid) -> Result<Vec<OrderResponse>, ServiceError> {
        let db = &*self.db_pool;
        let orders = OrderEntity::find()
            .filter(order::Column::UserId.eq(owner))
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list own orders");
                ServiceError::DatabaseError(e)
            })?;

        self.attach_items(orders, &HashMap::new()).await
    }

    /// Back-office listing: pickup-pending orders first, newest first within each group.
    #[instrument(skip(self))]
    pub async fn list_orders_for_admin(
        &self,
        query: AdminOrderQuery,
    ) -> Result<AdminOrderPage, ServiceError> {
        let db = &*self.db_pool;
        let limit = query.limit.max(1);
        let page = query.page.max(1);

        let mut select = OrderEntity::find();

        if let Some(term) = query
            .search_term
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            let pattern = format!("%{}%", term.to_lowercase());
            let matching_owners = Query::select()
                .column((UserEntity, user::Column::Id))
                .from(UserEntity)
                .and_where(
                    Expr::expr(Func::lower(Expr::col((UserEntity, user::Column::Name))))
                        .like(pattern),
                )
                .to_owned();
            select = select.filter(order::Column::UserId.in_subquery(matching_owners));
        }

        if let Some(ready) = query.pickup_ready {
            select = select.filter(order::Column::IsPickupReady.eq(ready));
        }

        let paginator = select
            .order_by_asc(order::Column::IsPickupReady)
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .paginate(db, limit);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count orders");
            ServiceError::DatabaseError(e)
        })?;
        let orders = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, page, "Failed to fetch order page");
            ServiceError::DatabaseError(e)
        })?;

        let owner_ids: Vec<Uuid> = orders.iter().map(|o| o.user_id).collect();
        let names: HashMap<Uuid, String> = UserEntity::find()
            .filter(user::Column::Id.is_in(owner_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        Ok(AdminOrderPage {
            orders: self.attach_items(orders, &names).await?,
            pages: total.div_ceil(limit),
        })
    }

    /// Staff flag for counter pickup.
    #[instrument(skip(self))]
    pub async fn mark_pickup_ready(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;
        let existing = OrderEntity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found_order(order_id))?;

        let mut active: OrderActiveModel = existing.into();
        active.is_pickup_ready = Set(true);
        active.update(db).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to flag order for pickup");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, "Order ready for pickup");
        self.get_order_by_id(order_id).await
    }

    async fn attach_items(
        &self,
        orders: Vec<OrderModel>,
        names: &HashMap<Uuid, String>,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }
        let db = &*self.db_pool;
        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();

        let mut grouped: HashMap<Uuid, Vec<OrderItemModel>> = HashMap::new();
        for batch in ids.chunks(ITEM_LOOKUP_BATCH) {
            let items = OrderItemEntity::find()
                .filter(order_item::Column::OrderId.is_in(batch.iter().copied()))
                .order_by_asc(order_item::Column::Position)
                .all(db)
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to load order items");
                    ServiceError::DatabaseError(e)
                })?;
            for item in items {
                grouped.entry(item.order_id).or_default().push(item);
            }
        }

        Ok(orders
            .into_iter()
            .map(|o| {
                let items = grouped.remove(&o.id).unwrap_or_default();
                let name = names.get(&o.user_id).cloned();
                model_to_response(o, items, name)
            })
            .collect())
    }
}

pub(crate) fn model_to_response(
    model: OrderModel,
    items: Vec<OrderItemModel>,
    user_name: Option<String>,
) -> OrderResponse {
    let payment_result = match (
        model.payment_result_id,
        model.payment_result_status,
        model.payment_result_update_time,
        model.payment_result_email_address,
    ) {
        (Some(id), Some(status), Some(update_time), Some(email_address)) => Some(PaymentResult {
            id,
            status,
            update_time,
            email_address,
        }),
        _ => None,
    };

    OrderResponse {
        id: model.id,
        user: model.user_id,
        user_name,
        order_items: items
            .into_iter()
            .map(|i| OrderItemResponse {
                product: i.product_id,
                name: i.name,
                slug: i.slug,
                image: i.image,
                price: i.price,
                quantity: i.quantity,
            })
            .collect(),
        shipping_info: ShippingInfo {
            first_name: model.shipping_first_name,
            last_name: model.shipping_last_name,
            phone_number: model.shipping_phone_number,
            address: model.shipping_address,
            city: model.shipping_city,
            region: model.shipping_region,
            zip: model.shipping_zip,
        },
        payment_method: model.payment_method,
        payment_result,
        items_price: model.items_price,
        tax_price: model.tax_price,
        total_price: model.total_price,
        is_paid: model.is_paid,
        paid_at: model.paid_at,
        is_pickup_ready: model.is_pickup_ready,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn draft() -> OrderDraft {
        OrderDraft {
            order_items: vec![OrderItemInput {
                product: Uuid::new_v4(),
                name: "Cold Brew Kit".into(),
                slug: "cold-brew-kit".into(),
                image: "/images/cold-brew.jpg".into(),
                price: dec!(50.00),
                quantity: 2,
            }],
            shipping_info: ShippingInfo {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                phone_number: "555-0100".into(),
                address: "12 Analytical Way".into(),
                city: "Austin".into(),
                region: "TX".into(),
                zip: "73301".into(),
            },
            payment_method: PaymentMethod::PayPal,
            items_price: dec!(100.00),
            tax_price: dec!(8.25),
            total_price: dec!(108.25),
        }
    }

    #[test]
    fn well_formed_draft_passes() {
        assert!(draft().check().is_ok());
    }

    #[test]
    fn empty_cart_is_rejected() {
        let mut d = draft();
        d.order_items.clear();
        assert_matches!(d.check(), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn blank_shipping_field_is_rejected() {
        let mut d = draft();
        d.shipping_info.city = "  ".into();
        assert_matches!(d.check(), Err(ServiceError::ValidationError(msg)) if msg.contains("city"));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut d = draft();
        d.order_items[0].quantity = 0;
        assert_matches!(d.check(), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut d = draft();
        d.tax_price = dec!(-1);
        d.total_price = dec!(99.00);
        assert_matches!(d.check(), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn total_must_equal_items_plus_tax() {
        let mut d = draft();
        d.total_price = dec!(100.00);
        assert_matches!(d.check(), Err(ServiceError::ValidationError(msg)) if msg.contains("totalPrice"));
    }

    #[test]
    fn draft_accepts_storefront_json() {
        let body = serde_json::json!({
            "orderItems": [{
                "product": Uuid::nil(),
                "name": "Mug",
                "slug": "mug",
                "image": "/mug.png",
                "price": "12.50",
                "quantity": 1,
                "countInStock": 4
            }],
            "shippingInfo": {
                "firstName": "A", "lastName": "B", "phoneNumber": "1",
                "address": "x", "city": "y", "region": "z", "zip": "0"
            },
            "paymentMethod": "Stripe",
            "itemsPrice": "12.50",
            "shippingPrice": "0.00",
            "taxPrice": "1.03",
            "totalPrice": "13.53"
        });
        let parsed: OrderDraft = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.payment_method, PaymentMethod::Stripe);
        assert!(parsed.check().is_ok());
    }

    #[test]
    fn unpaid_order_has_no_payment_result() {
        let now = Utc::now();
        let model = OrderModel {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            shipping_first_name: "A".into(),
            shipping_last_name: "B".into(),
            shipping_phone_number: "1".into(),
            shipping_address: "x".into(),
            shipping_city: "y".into(),
            shipping_region: "z".into(),
            shipping_zip: "0".into(),
            payment_method: PaymentMethod::PayPal,
            payment_result_id: None,
            payment_result_status: None,
            payment_result_update_time: None,
            payment_result_email_address: None,
            items_price: dec!(1),
            tax_price: dec!(0),
            total_price: dec!(1),
            is_paid: false,
            paid_at: None,
            is_pickup_ready: false,
            created_at: now,
            updated_at: now,
        };
        let response = model_to_response(model, Vec::new(), None);
        assert!(response.payment_result.is_none());
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("paymentResult").is_none());
        assert_eq!(json["isPaid"], false);
    }
}
