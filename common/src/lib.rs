pub mod auth;
pub mod context;
pub mod entities;
pub mod error;
pub mod repository;
