pub mod dates;
pub mod error;
pub mod invoice_mail;
pub mod ports;
pub mod repo;
pub mod service;
