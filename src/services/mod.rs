pub mod notification_service;
pub mod pricing_service;
