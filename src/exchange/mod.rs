pub mod bitget;

pub use bitget::{build_order_payload, BitgetClient, OrderPayload, PLACE_ORDER_ENDPOINT};
