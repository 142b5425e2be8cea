pub mod identifier;
pub mod role;
pub mod session;
