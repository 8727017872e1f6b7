//! Classroom provider connectors: typed REST client, course/roster pull,
//! and the outbound coursework and grade-passback push paths.

pub mod client;
pub mod models;
pub mod pull;
pub mod push;
