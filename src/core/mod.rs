pub mod cache;
pub mod corpus;
pub mod dataset;
pub mod hashing;
pub mod table;
