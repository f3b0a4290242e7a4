pub mod agent;
pub mod identity;
pub mod mail;
pub mod storage;
