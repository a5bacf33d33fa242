pub mod firebase;
pub mod jwt;
pub mod models;
pub mod routes;
pub mod session;
