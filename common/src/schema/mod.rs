mod annotation;
mod batch;
mod seed;
mod stt;
mod users;

pub use annotation::*;
pub use batch::*;
pub use seed::*;
pub use stt::*;
pub use users::*;
