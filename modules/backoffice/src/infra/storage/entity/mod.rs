//! SeaORM entities. Ids are stored as their 24-char hex text; line items as JSON text.

pub mod clients;
pub mod expenses;
pub mod invoices;
pub mod jobs;
pub mod users;
