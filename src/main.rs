use actix_web::{middleware::Logger, web, App, HttpServer};
use log::info;

use biorreactor::config::ServiceConfig;
use biorreactor::routes;
use biorreactor::sqlite_database::SqliteDatabase;

#[actix_web::main]
async fn main() -> Result<(), String> {
    let config = ServiceConfig::from_env()
        .map_err(|err| format!("Invalid configuration: {}", err))?;

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(config.log_level.as_str()));

    let settings = config.app_settings()
        .map_err(|err| format!("Invalid configuration: {}", err))?;
    let database = SqliteDatabase::new(&config.database_url)
        .map_err(|err| format!("Could not open database {}: {}", config.database_url, err))?;

    info!("Listening on {}, rendering times in {}", config.bind_address, settings.time_zone);

    let srv = HttpServer::new(move || {
            App::new()
                .wrap(Logger::default())
                .app_data(web::Data::new(database.clone()))
                .app_data(web::Data::new(settings.clone()))
                .configure(routes::<SqliteDatabase>)
        })
        .bind(&config.bind_address)
        .map_err(|err| format!("Could not bind {}: {}", config.bind_address, err))?
        .shutdown_timeout(60)
        .run();

    srv.await.map_err(|err| err.to_string())?;
    info!("Server stopped");
    Ok(())
}
