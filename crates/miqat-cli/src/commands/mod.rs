pub mod adjust;
pub mod alarm;
pub mod config;
pub mod location;
pub mod session;
pub mod times;
