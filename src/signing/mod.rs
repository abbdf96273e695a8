pub mod hmac;

pub use hmac::{canonical_query, normalize_secret, sign, ExchangeCredentials, RequestSigner};
