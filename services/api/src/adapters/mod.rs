pub mod db;
pub mod random;

pub use db::DbAdapter;
pub use random::ThreadRandom;
