pub mod connection;
pub mod health;
pub mod reports;

pub use connection::*;
pub use health::*;
pub use reports::*;
