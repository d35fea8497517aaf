pub mod loan;

pub use loan::{CreateLoanRequest, Loan, LoanPatch, LoanStatus, LoanSummary, UserLoans};
