//! Repository layer — query functions organized by domain.

pub mod accounts;
pub mod aestheticians;
pub mod analytics;
pub mod appointments;
pub mod branches;
pub mod services;
pub mod users;
pub mod vouchers;
pub mod walk_ins;
