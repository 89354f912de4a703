pub mod chunk;
pub mod inventory;
pub mod status;
