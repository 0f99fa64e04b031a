pub mod checkout;
pub mod resolver;

pub use checkout::CheckoutService;
pub use resolver::{Resolution, TransactionResolver};
