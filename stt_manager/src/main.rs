mod calendar;
mod config;
mod handlers;
mod neto;
mod state;

use actix_jwt_auth_middleware::{Authority, TokenSigner, use_jwt::UseJWTOnApp};
use actix_state_guards::UseStateGuardOnScope;
use actix_web::{
    App, HttpServer, error::InternalError, http::StatusCode, middleware::Logger, web,
};
use common::User;
use dotenv::dotenv;
use ed25519_compact::KeyPair;
use jwt_compact::alg::Ed25519;
use pretty_env_logger::env_logger::{Builder, Env};

use crate::config::AppConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    if cli::run_cli().await {
        return Ok(());
    }

    let logger_env = Env::default().default_filter_or("debug");
    let mut logger_builder = Builder::from_env(logger_env);
    logger_builder.init();

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Application initialization failed: {:#}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    let state = config.create_app_state().await.map_err(|e| {
        log::error!("Application initialization failed: {:#}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    log::info!("App state initialized successfully");

    if let Some(seed_yaml) = &config.seed_yaml {
        state.initialize_data_from_file(seed_yaml).await.map_err(|e| {
            log::error!("Data initialization failed: {:#}", e);
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
        })?;
        log::info!("Seed data loaded successfully");
    }

    let data = web::Data::new(state);

    // Authorization
    let KeyPair {
        pk: public_key,
        sk: secret_key,
    } = KeyPair::generate();

    let bind_addr = (config.host.clone(), config.port);
    HttpServer::new(move || {
        let authority = Authority::<User, Ed25519, _, _>::new()
            .refresh_authorizer(|| async move { Ok(()) })
            .token_signer(Some(
                TokenSigner::new()
                    .signing_key(secret_key.clone())
                    .algorithm(Ed25519)
                    .build()
                    .expect("Failed to generate TokenSigner"),
            ))
            .verifying_key(public_key)
            .build()
            .expect("Failed to create Authority");

        App::new()
            .app_data(data.clone())
            .wrap(Logger::new("%a %t %r %s  %{Referer}i %Dms"))
            .service(handlers::login)
            .use_jwt(
                authority,
                web::scope("")
                    .service(handlers::index)
                    .service(handlers::create_stt)
                    .service(handlers::list_stt)
                    .service(handlers::list_customers)
                    .service(handlers::update_stt)
                    .service(handlers::create_batch)
                    .service(handlers::list_batches)
                    .service(handlers::lookup_batches)
                    .service(handlers::update_batch)
                    .service(handlers::get_batch)
                    .service(handlers::calendar_view)
                    .service(handlers::get_customer)
                    .service(handlers::save_schedule)
                    .use_state_guard(
                        |user: User| async move {
                            if user.is_superuser {
                                Ok(())
                            } else {
                                Err(InternalError::new(
                                    "You are not an Admin",
                                    StatusCode::UNAUTHORIZED,
                                ))
                            }
                        },
                        web::scope("")
                            .service(handlers::delete_stt)
                            .service(handlers::delete_batch),
                    ),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
