use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub identity_subject: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub personal_email: Option<String>,
    pub business_name: Option<String>,
    #[sea_orm(unique)]
    pub business_email: Option<String>,
    pub business_phone: Option<String>,
    pub business_address: Option<String>,
    pub business_category: Option<String>,
    pub hourly_rate: Option<f64>,
    pub last_invoice_number: Option<i64>,
    pub onboarding_complete: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
