use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub job_id: Option<String>,
    pub vendor_name: String,
    pub date: Option<DateTime<Utc>>,
    pub total_amount: f64,
    pub tax_amount: Option<f64>,
    pub currency: String,
    #[sea_orm(column_type = "Text")]
    pub line_items: String,
    pub receipt_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
