pub mod balance;
pub mod leave_request;
pub mod overview;
