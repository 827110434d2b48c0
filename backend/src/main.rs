pub mod config;
pub mod error;
pub mod features;
pub mod inference;
pub mod models;
pub mod routes;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use log::{error, info};

use config::ServerConfig;
use inference::get_model;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    info!("🚀 Démarrage du prédicteur d'utilisateurs LinkedIn");

    let config = ServerConfig::from_env();

    // Loaded before binding so no request ever sees an unloaded model.
    let model = match get_model(&config.model_path) {
        Ok(model) => {
            info!("✅ Modèle chargé avec succès ({})", model.name());
            model
        }
        Err(e) => {
            error!("❌ {}", e);
            if !config.model_path.exists() {
                error!(
                    "Pour un essai local: MODEL_PATH={} (depuis backend/)",
                    config::LOCAL_MODEL_PATH
                );
            }
            std::process::exit(1);
        }
    };

    let model_data = web::Data::new(model);
    let config_data = web::Data::new(config.clone());
    let bind_address = config.bind_address();

    info!("🌐 Serveur démarré sur: http://{}", bind_address);
    info!("👷 Workers: {}", config.workers);
    info!("📊 Formulaire disponible sur: http://{}/", bind_address);
    info!("🔧 Endpoints API:");
    info!("   GET  /api/health         - Vérification santé");
    info!("   GET  /api/options        - Choix du formulaire");
    info!("   GET  /api/model-info     - Information modèle");
    info!("   POST /api/predict        - Prédiction simple");
    info!("   POST /api/batch-predict  - Prédiction multiple");

    let static_dir = config.static_dir.clone();
    let origin = format!("http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&origin)
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .wrap(cors)
            .app_data(model_data.clone())
            .app_data(config_data.clone())
            .configure(routes::configure)
            .service(Files::new("/static", &static_dir).prefer_utf8(true))
            .default_service(web::route().to(routes::not_found))
    })
    .workers(config.workers)
    .bind(&bind_address)?
    .run()
    .await
}
