//! Database queries

pub mod activity;
pub mod contact;
pub mod route;
pub mod stop;
