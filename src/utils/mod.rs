pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{host_key, is_valid_url, resolve_href};
