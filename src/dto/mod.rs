pub mod booking_dto;
pub mod common_dto;
pub mod truck_dto;
