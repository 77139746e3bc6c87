mod db;
mod helpers;
mod recurrence;
mod schema;

pub use db::*;
pub use helpers::*;
pub use recurrence::*;
pub use schema::*;
