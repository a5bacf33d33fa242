pub mod firebase_db;
pub mod results;
pub mod uploads;

pub use firebase_db::StoreError;
