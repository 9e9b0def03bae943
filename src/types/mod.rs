//! Type definitions

pub mod contact;
pub mod messages;
pub mod route;
pub mod stop;

pub use contact::*;
pub use messages::*;
pub use route::*;
pub use stop::*;
