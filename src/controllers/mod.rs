pub mod booking_controller;
pub mod truck_controller;
