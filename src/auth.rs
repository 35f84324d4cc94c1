//! Auth-domain values: account numbers and bearer token secrets.

pub mod account;
pub mod token;

pub use account::*;
pub use token::*;
