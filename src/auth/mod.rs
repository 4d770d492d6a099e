pub mod jwt;

pub use jwt::BearerUser;
