pub mod jwks;

pub use jwks::JwksVerifier;
