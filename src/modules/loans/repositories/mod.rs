pub mod in_memory_loan_repository;
pub mod loan_repository;
pub mod mysql_loan_repository;

pub use in_memory_loan_repository::InMemoryLoanRepository;
pub use loan_repository::LoanRepository;
pub use mysql_loan_repository::MySqlLoanRepository;
