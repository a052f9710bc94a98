pub mod user;
pub mod post;
pub mod application;
pub mod review;
pub mod notification;

pub use user::*;
pub use post::*;
pub use application::*;
pub use review::*;
pub use notification::*;
