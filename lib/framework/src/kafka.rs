pub mod admin;
pub mod consumer;
pub mod producer;
pub mod topic;
