pub mod rest;
pub mod routes;
pub mod schema;
