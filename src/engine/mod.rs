pub mod aggregate;
pub mod health;
pub mod matcher;
pub mod platform;
pub mod significance;
