//! Stateless helpers shared by the service layer.

pub mod jwt;
