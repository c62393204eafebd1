pub use self::hash_set::StripedHashSet;
pub use self::options::{ConfigError, HashSetOptions};

mod hash_set;
mod options;
