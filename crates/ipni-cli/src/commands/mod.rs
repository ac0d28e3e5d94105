pub mod fixture;
pub mod keygen;
pub mod show;
pub mod verify;
