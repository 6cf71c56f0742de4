use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{
        order::{self, Entity as OrderEntity, Model as OrderModel},
        order_item::{Entity as OrderItemEntity, Model as OrderItemModel},
        product::{Entity as ProductEntity, Model as ProductModel},
        user::Entity as UserEntity,
    },
    errors::ServiceError,
};

const TOP_PRODUCT_LIMIT: usize = 5;
const UNCATEGORIZED: &str = "Uncategorized";

/// Bucket width of the sales series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl TimeRange {
    fn bucket(self, at: DateTime<Utc>) -> String {
        match self {
            TimeRange::Daily => at.format("%Y-%m-%d").to_string(),
            TimeRange::Weekly => {
                let week = at.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            TimeRange::Monthly => at.format("%Y-%m").to_string(),
            TimeRange::Yearly => at.format("%Y").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product: Uuid,
    pub name: String,
    pub quantity_sold: i64,
    #[schema(value_type = String)]
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRevenue {
    pub department: String,
    #[schema(value_type = String)]
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesBucket {
    pub period: String,
    pub order_count: u64,
    #[schema(value_type = String)]
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAggregates {
    pub range: TimeRange,
    pub total_users: u64,
    pub total_orders: u64,
    /// Sum of `totalPrice` over paid orders
    #[schema(value_type = String)]
    pub total_revenue: Decimal,
    pub top_products: Vec<TopProduct>,
    pub revenue_by_department: Vec<DepartmentRevenue>,
    /// Every placed order, bucketed by `range`
    pub sales: Vec<SalesBucket>,
    pub generated_at: DateTime<Utc>,
}

/// Folds raw rows into dashboard figures. Revenue figures only count paid orders.
pub fn aggregate(
    range: TimeRange,
    total_users: u64,
    orders: &[OrderModel],
    items: &[OrderItemModel],
    products: &[ProductModel],
) -> DashboardAggregates {
    let paid: HashSet<Uuid> = orders.iter().filter(|o| o.is_paid).map(|o| o.id).collect();
    let total_revenue = orders
        .iter()
        .filter(|o| o.is_paid)
        .map(|o| o.total_price)
        .sum();

    let departments: HashMap<Uuid, &str> = products
        .iter()
        .map(|p| (p.id, p.department.as_str()))
        .collect();

    let mut by_product: HashMap<Uuid, TopProduct> = HashMap::new();
    let mut by_department: BTreeMap<String, Decimal> = BTreeMap::new();
    for item in items.iter().filter(|i| paid.contains(&i.order_id)) {
        let line_total = item.price * Decimal::from(item.quantity);

        let entry = by_product.entry(item.product_id).or_insert_with(|| TopProduct {
            product: item.product_id,
            name: item.name.clone(),
            quantity_sold: 0,
            revenue: Decimal::ZERO,
        });
        entry.quantity_sold += i64::from(item.quantity);
        entry.revenue += line_total;

        let department = departments
            .get(&item.product_id)
            .copied()
            .unwrap_or(UNCATEGORIZED);
        *by_department.entry(department.to_string()).or_default() += line_total;
    }

    let mut top_products: Vec<TopProduct> = by_product.into_values().collect();
    top_products.sort_by(|a, b| {
        b.quantity_sold
            .cmp(&a.quantity_sold)
            .then_with(|| b.revenue.cmp(&a.revenue))
            .then_with(|| a.name.cmp(&b.name))
    });
    top_products.truncate(TOP_PRODUCT_LIMIT);

    let mut revenue_by_department: Vec<DepartmentRevenue> = by_department
        .into_iter()
        .map(|(department, revenue)| DepartmentRevenue {
            department,
            revenue,
        })
        .collect();
    revenue_by_department.sort_by(|a, b| b.revenue.cmp(&a.revenue));

    let mut buckets: BTreeMap<String, (u64, Decimal)> = BTreeMap::new();
    for o in orders {
        let slot = buckets.entry(range.bucket(o.created_at)).or_default();
        slot.0 += 1;
        slot.1 += o.total_price;
    }
    let sales = buckets
        .into_iter()
        .map(|(period, (order_count, total))| SalesBucket {
            period,
            order_count,
            total,
        })
        .collect();

    DashboardAggregates {
        range,
        total_users,
        total_orders: orders.len() as u64,
        total_revenue,
        top_products,
        revenue_by_department,
        sales,
        generated_at: Utc::now(),
    }
}

/// Back-office sales dashboard. Recomputed from the tables on every call.
#[derive(Clone)]
pub struct AnalyticsService {
    db: Arc<DatabaseConnection>,
}

impl AnalyticsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn get_dashboard_aggregates(
        &self,
        range: TimeRange,
    ) -> Result<DashboardAggregates, ServiceError> {
        let db = &*self.db;
        let db_err = |e: sea_orm::DbErr| {
            error!(error = %e, "Dashboard aggregation query failed");
            ServiceError::DatabaseError(e)
        };

        let total_users = UserEntity::find().count(db).await.map_err(db_err)?;
        let orders = OrderEntity::find().all(db).await.map_err(db_err)?;
        // Joined rather than filtered by id list so the query size does not
        // grow with the number of paid orders.
        let items = OrderItemEntity::find()
            .inner_join(OrderEntity)
            .filter(order::Column::IsPaid.eq(true))
            .all(db)
            .await
            .map_err(db_err)?;
        let products = ProductEntity::find().all(db).await.map_err(db_err)?;

        let aggregates = aggregate(range, total_users, &orders, &items, &products);
        info!(
            orders = aggregates.total_orders,
            revenue = %aggregates.total_revenue,
            "Dashboard aggregates computed"
        );
        Ok(aggregates)
    }
}
