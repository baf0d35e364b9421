//! Wire models for the cloud APIs used by botdeploy

pub mod models;
