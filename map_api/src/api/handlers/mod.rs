pub mod map;
pub mod vehicles;
