//! Wire types shared between the fintrack backend and its clients.

pub mod model;
pub mod requests;
