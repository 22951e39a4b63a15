//! EFOS reference data: the published list of definitive shell-company issuers.

mod blacklist;
mod loader;

pub use blacklist::Blacklist;
pub use loader::{clear_cache, decode, load, load_cached, parse_listing, try_load};
