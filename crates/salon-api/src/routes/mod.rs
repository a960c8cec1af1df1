//! API route modules.

pub mod aestheticians;
pub mod analytics;
pub mod appointments;
pub mod auth;
pub mod branches;
pub mod health;
pub mod images;
pub mod payments;
pub mod services;
pub mod users;
pub mod vouchers;
pub mod walk_ins;
