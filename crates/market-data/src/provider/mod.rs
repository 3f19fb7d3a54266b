//! Quote provider abstraction and the HTTP implementation.

mod http;
mod traits;

pub use http::{HttpQuoteProvider, DEFAULT_BASE_URL};
pub use traits::QuoteProvider;
