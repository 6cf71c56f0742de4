use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// How the customer chose to pay. Fixed at checkout.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "PayPal")]
    PayPal,
    #[sea_orm(string_value = "Stripe")]
    Stripe,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,

    pub shipping_first_name: String,
    pub shipping_last_name: String,
    pub shipping_phone_number: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_region: String,
    pub shipping_zip: String,

    pub payment_method: PaymentMethod,
    pub payment_result_id: Option<String>,
    pub payment_result_status: Option<String>,
    pub payment_result_update_time: Option<String>,
    pub payment_result_email_address: Option<String>,

    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub total_price: Decimal,

    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_pickup_ready: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        active_model.updated_at = sea_orm::ActiveValue::Set(Utc::now());
        Ok(active_model)
    }
}
