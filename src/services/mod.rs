pub mod api_client;
pub mod kv_store;
pub mod recommendations;
pub mod router;
pub mod session_store;
