pub mod db;
pub mod error;
pub mod http;
pub mod json_store;
pub mod media;
pub mod telemetry;
