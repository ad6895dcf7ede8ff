//! 도메인 타입.

pub mod price;
pub mod rating;
pub mod recommendation;

pub use price::*;
pub use rating::*;
pub use recommendation::*;
