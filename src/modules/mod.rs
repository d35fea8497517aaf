pub mod health;
pub mod loans;
pub mod notifications;
pub mod transactions;
