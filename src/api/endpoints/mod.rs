//! Request handlers, one module per resource.

pub mod health;
pub mod index;
pub mod info;
pub mod predict;
