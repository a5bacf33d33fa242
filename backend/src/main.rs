mod auth;
mod inference;
mod routes;
mod store;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use auth::firebase::FirebaseAuthService;
use auth::jwt::JwtService;
use inference::Classifier;
use routes::{configure_routes, ModelRegistry};
use std::env;
use store::firebase_db::FirebaseDbClient;
use store::results::ResultStore;
use store::uploads::UploadStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let cnn_model_path =
        env::var("CNN_MODEL_PATH").unwrap_or_else(|_| "models/alzheimer_cnn_model.pt".to_string());
    let knn_model_path =
        env::var("KNN_MODEL_PATH").unwrap_or_else(|_| "models/alzheimer_knn_model.pt".to_string());

    let cnn = Classifier::load(&cnn_model_path).map_err(|e| {
        std::io::Error::other(format!("failed to load CNN model from {cnn_model_path}: {e}"))
    })?;
    let knn = Classifier::load(&knn_model_path).map_err(|e| {
        std::io::Error::other(format!("failed to load KNN model from {knn_model_path}: {e}"))
    })?;
    let models = ModelRegistry { cnn, knn };
    log::info!("Loaded classifiers from {cnn_model_path} and {knn_model_path}");

    let firebase_api_key = env::var("FIREBASE_API_KEY").unwrap().to_string();
    let firebase_db_url = env::var("FIREBASE_DB_URL").unwrap().to_string();
    let jwt_secret = env::var("JWT_SECRET").unwrap().to_string();
    let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "static/tests".to_string());

    let auth_service = FirebaseAuthService::new(firebase_api_key);
    let result_store = ResultStore::new(FirebaseDbClient::new(firebase_db_url));
    let jwt_service = JwtService::new(&jwt_secret);
    let upload_store = UploadStore::new(&upload_dir)?;

    let port = env::var("PORT").unwrap_or_else(|_| "8081".to_string());
    let bind_address = format!("0.0.0.0:{}", port);

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(models.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(result_store.clone()))
            .app_data(web::Data::new(jwt_service.clone()))
            .app_data(web::Data::new(upload_store.clone()))
            .configure(|cfg| configure_routes(cfg, upload_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
