pub mod booking_repository;
pub mod truck_repository;
