//! Application services layer.

pub mod composer;
pub mod error;
pub mod feed;
pub mod store;
