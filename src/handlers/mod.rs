pub mod admin;
pub mod booking;
pub mod firebase;
pub mod verify;
