pub mod auth_service;
pub mod image_service;
pub mod permissions;
pub mod validation;
