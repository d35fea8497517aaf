pub mod in_memory_transaction_repository;
pub mod mysql_transaction_repository;
pub mod transaction_repository;

pub use in_memory_transaction_repository::InMemoryTransactionRepository;
pub use mysql_transaction_repository::MySqlTransactionRepository;
pub use transaction_repository::TransactionRepository;
