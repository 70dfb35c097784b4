pub mod contact;
pub mod employee;
pub mod manager;
pub mod person;
