pub mod booking_routes;
pub mod truck_routes;
