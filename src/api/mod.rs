pub mod activation;
pub mod cabinet;
pub mod customers;
pub mod registration;
