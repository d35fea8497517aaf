pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{CreateLoanRequest, Loan, LoanPatch, LoanStatus, LoanSummary, UserLoans};
pub use services::LoanService;
