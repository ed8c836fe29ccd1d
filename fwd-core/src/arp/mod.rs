mod cache;
pub use self::cache::*;

mod resolver;
pub use self::resolver::*;
