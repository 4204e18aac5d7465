pub mod dto;
pub mod phone;
