use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{web, Error, HttpResponse};
use futures::{StreamExt, TryStreamExt};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::{MetricsStrategy, PredictionResponse, ResultRecord};
use std::io::Write;

use crate::auth::models::{SessionIdentity, SessionState};
use crate::auth::routes as auth_routes;
use crate::auth::session::Session;
use crate::inference::metrics::{Metrics, MetricsPolicy, KNN_ACCURACY_DISPLAY_OFFSET};
use crate::inference::{preprocess, Classifier, InferenceError};
use crate::store::results::ResultStore;
use crate::store::uploads::{UploadStore, UploadedImage};
use crate::store::StoreError;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Both classifiers, loaded once at startup and shared read-only. The
/// "KNN" name is historical; both are convolutional TorchScript models.
#[derive(Clone)]
pub struct ModelRegistry {
    pub cnn: Classifier,
    pub knn: Classifier,
}

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    pub metrics: Option<MetricsStrategy>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, upload_dir: String) {
    cfg.service(web::resource("/api/predict/{model}").route(web::post().to(handle_predict)))
        .service(web::resource("/api/results").route(web::get().to(list_results)))
        .service(web::resource("/api/health").route(web::get().to(health)))
        .service(web::resource("/auth/token").route(web::post().to(auth_routes::sign_in)))
        .service(web::resource("/auth/register").route(web::post().to(auth_routes::register)))
        .service(web::resource("/auth/refresh").route(web::post().to(auth_routes::refresh)))
        .service(web::resource("/auth/me").route(web::get().to(auth_routes::me)))
        .service(Files::new("/static", upload_dir));
}

async fn handle_predict(
    path: web::Path<String>,
    query: web::Query<PredictQuery>,
    mut payload: Multipart,
    models: web::Data<ModelRegistry>,
    uploads: web::Data<UploadStore>,
    store: web::Data<ResultStore>,
    session: Session,
) -> Result<HttpResponse, Error> {
    let model_name = path.into_inner();
    let (classifier, default_decimals) = match model_name.as_str() {
        "cnn" => (&models.cnn, 2),
        "knn" => (&models.knn, 3),
        other => {
            return Ok(HttpResponse::NotFound().json(ErrorResponse {
                error: format!("unknown model '{other}'"),
            }));
        }
    };

    let Some(upload) = read_image_field(&mut payload).await? else {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: "no image file in request".to_string(),
        }));
    };

    // A failed upload write aborts this submission only.
    let image_path = match uploads.save(&upload) {
        Ok(path) => path,
        Err(err) => {
            error!("failed to store uploaded image {}: {err}", upload.file_name);
            return Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: "could not store uploaded image".to_string(),
            }));
        }
    };

    let tensor = match preprocess::prepare(&upload.data) {
        Ok(tensor) => tensor,
        Err(err @ InferenceError::Decode(_)) => {
            return Ok(HttpResponse::BadRequest().json(ErrorResponse {
                error: err.to_string(),
            }));
        }
        Err(err) => {
            error!("preprocessing failed for {}: {err}", upload.file_name);
            return Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: "preprocessing failed".to_string(),
            }));
        }
    };

    let (diagnosis, class_index) = match classifier.classify(&tensor) {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("inference failed on model {model_name}: {err}");
            return Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: "inference failed".to_string(),
            }));
        }
    };

    let strategy = query.metrics.unwrap_or(MetricsStrategy::Synthetic);
    let policy = match strategy {
        MetricsStrategy::Synthetic => MetricsPolicy::Synthetic {
            decimals: default_decimals,
        },
        MetricsStrategy::Computed => MetricsPolicy::SingleSampleComputed,
    };
    let metrics = policy.compute(class_index);

    let mut saved = false;
    let mut warning = None;
    if let Some(identity) = persistence_identity(&session.0) {
        let record = build_record(&diagnosis.to_string(), &metrics, &image_path);
        match store.append(&identity.user_id, &record).await {
            Ok(key) => {
                info!("stored result {key} for user {}", identity.user_id);
                saved = true;
            }
            Err(err) => {
                // Persistence failure is non-fatal; the caller still
                // gets the prediction.
                error!("failed to persist result for {}: {err}", identity.user_id);
                warning = Some("result could not be saved to history".to_string());
            }
        }
    }

    let accuracy = display_accuracy(&model_name, strategy, metrics.accuracy);

    Ok(HttpResponse::Ok().json(PredictionResponse {
        prediction: diagnosis.to_string(),
        accuracy,
        precision: metrics.precision,
        recall: metrics.recall,
        f1_score: metrics.f1,
        image_path,
        saved,
        warning,
    }))
}

async fn read_image_field(payload: &mut Multipart) -> Result<Option<UploadedImage>, Error> {
    while let Ok(Some(mut field)) = payload.try_next().await {
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(str::to_string));

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes = chunk?;
            data.write_all(&bytes)?;
        }
        if !data.is_empty() {
            return Ok(Some(UploadedImage {
                file_name: file_name.unwrap_or_else(|| "upload".to_string()),
                data,
            }));
        }
    }
    Ok(None)
}

fn persistence_identity(state: &SessionState) -> Option<&SessionIdentity> {
    if state.is_authorized_to_persist() {
        state.identity()
    } else {
        None
    }
}

fn build_record(label: &str, metrics: &Metrics, image_path: &str) -> ResultRecord {
    ResultRecord {
        result: label.to_string(),
        f1_score: metrics.f1,
        accuracy: metrics.accuracy,
        precision: metrics.precision,
        recall: metrics.recall,
        image_path: image_path.to_string(),
        created_at: chrono::Local::now().format("%Y-%m-%d").to_string(),
    }
}

// The legacy KNN flow displayed accuracy with a +36 offset when metrics
// were computed rather than drawn; stored records keep the raw value.
fn display_accuracy(model_name: &str, strategy: MetricsStrategy, accuracy: f64) -> f64 {
    if model_name == "knn" && strategy == MetricsStrategy::Computed {
        accuracy + KNN_ACCURACY_DISPLAY_OFFSET
    } else {
        accuracy
    }
}

async fn list_results(
    session: Session,
    store: web::Data<ResultStore>,
) -> Result<HttpResponse, Error> {
    if !session.0.is_authorized_to_read_history() {
        return Ok(HttpResponse::Unauthorized().json(ErrorResponse {
            error: "sign in to view past results".to_string(),
        }));
    }
    let Some(identity) = session.0.identity() else {
        return Ok(HttpResponse::Unauthorized().json(ErrorResponse {
            error: "sign in to view past results".to_string(),
        }));
    };

    match store.list_for(&identity.user_id).await {
        Ok(records) => Ok(HttpResponse::Ok().json(records)),
        // An absent node just means this user has not stored anything yet.
        Err(StoreError::NoHistory(_)) => Ok(HttpResponse::Ok().json(Vec::<ResultRecord>::new())),
        Err(err) => {
            error!("failed to list results for {}: {err}", identity.user_id);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: "could not load past results".to_string(),
            }))
        }
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "OK" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> SessionIdentity {
        SessionIdentity {
            user_id: "uid-9".to_string(),
            email: "d@w.com".to_string(),
            display_name: "Dana".to_string(),
        }
    }

    fn metrics() -> Metrics {
        Metrics {
            accuracy: 1.0,
            precision: 0.5,
            recall: 0.25,
            f1: 0.75,
        }
    }

    #[test]
    fn logged_out_submissions_never_reach_the_store() {
        assert!(persistence_identity(&SessionState::LoggedOut).is_none());
    }

    #[test]
    fn logged_in_submissions_persist_under_the_caller_id() {
        let state = SessionState::LoggedIn(identity());
        assert_eq!(persistence_identity(&state).unwrap().user_id, "uid-9");
    }

    #[test]
    fn records_are_stamped_with_the_local_date() {
        let record = build_record("Very Mild Demented", &metrics(), "/static/abc.png");
        assert_eq!(record.result, "Very Mild Demented");
        assert_eq!(record.accuracy, 1.0);
        assert_eq!(record.f1_score, 0.75);
        assert_eq!(record.image_path, "/static/abc.png");
        assert_eq!(
            record.created_at,
            chrono::Local::now().format("%Y-%m-%d").to_string()
        );
        let parts: Vec<&str> = record.created_at.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 4);
        assert_eq!(parts[1].len(), 2);
        assert_eq!(parts[2].len(), 2);
    }

    #[test]
    fn accuracy_offset_applies_only_to_computed_knn_output() {
        assert_eq!(
            display_accuracy("knn", MetricsStrategy::Computed, 1.0),
            1.0 + KNN_ACCURACY_DISPLAY_OFFSET
        );
        assert_eq!(display_accuracy("knn", MetricsStrategy::Synthetic, 88.0), 88.0);
        assert_eq!(display_accuracy("cnn", MetricsStrategy::Computed, 1.0), 1.0);
        assert_eq!(display_accuracy("cnn", MetricsStrategy::Synthetic, 88.0), 88.0);
    }
}
