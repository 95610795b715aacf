pub mod query;
pub mod rest;
