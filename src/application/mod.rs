//! Application services layer.

pub mod beacon;
pub mod error;
pub mod page;
pub mod response;
