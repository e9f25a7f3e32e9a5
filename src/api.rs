pub mod errors;
mod requests;
pub mod responses;
pub mod routes;
