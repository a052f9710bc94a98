pub mod application;
pub mod post;
pub mod provider;
pub mod review;
