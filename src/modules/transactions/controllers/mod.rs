pub mod transaction_controller;

pub use transaction_controller::configure;
