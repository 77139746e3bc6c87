mod auth;
mod batch;
mod calendar;
mod stt;

use actix_web::{HttpResponse, Responder, get};
pub use auth::*;
pub use batch::*;
pub use calendar::*;
pub use stt::*;

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("Welcome to the STT Manager service!")
}
