use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub client_id: Option<String>,
    pub job_id: Option<String>,
    pub invoice_number: String,
    pub invoice_title: Option<String>,
    pub invoice_description: Option<String>,
    pub status: String,
    pub issue_date: Option<String>,
    pub due_date: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub line_items: String,
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
