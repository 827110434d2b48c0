use std::sync::Arc;
use std::time::Instant;

use actix_files::NamedFile;
use actix_web::error::InternalError;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::PredictorError;
use crate::features::encode_form;
use crate::inference::{self, Classifier, ModelInfo};
use crate::models::{ApiResponse, FeatureVector, FormOptions, FormSubmission, PredictionView};

pub type ModelData = web::Data<Arc<dyn Classifier>>;

fn error_response(err: &PredictorError, start_time: Instant) -> HttpResponse {
    let response = ApiResponse::<()>::error(&err.to_string()).timed(start_time);
    if err.is_client_error() {
        HttpResponse::BadRequest().json(response)
    } else {
        HttpResponse::InternalServerError().json(response)
    }
}

pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success("✅ Prédicteur d'utilisateurs LinkedIn"))
}

pub async fn form_options() -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(FormOptions::current()))
}

pub async fn model_info(model: ModelData) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(ModelInfo::describe(model.get_ref().as_ref())))
}

pub async fn predict_usage(model: ModelData, req: web::Json<FormSubmission>) -> HttpResponse {
    let start_time = Instant::now();
    info!("Nouvelle requête de prédiction reçue");

    let features = match encode_form(&req) {
        Ok(features) => features,
        Err(e) => {
            warn!("Validation échouée: {}", e);
            return error_response(&e, start_time);
        }
    };

    let model = model.get_ref().clone();
    match web::block(move || inference::predict(model.as_ref(), &features)).await {
        Ok(Ok(result)) => {
            info!(
                "Prédiction réussie: classe={} probabilité={:.3}",
                result.predicted_class, result.positive_probability
            );
            let view = PredictionView::new(result, features);
            HttpResponse::Ok().json(ApiResponse::success(view).timed(start_time))
        }
        Ok(Err(e)) => {
            error!("Erreur de prédiction: {}", e);
            error_response(&e, start_time)
        }
        Err(e) => {
            error!("Erreur d'exécution bloquante: {}", e);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Erreur d'exécution").timed(start_time))
        }
    }
}

pub async fn batch_predict(model: ModelData, req: web::Json<Vec<FormSubmission>>) -> HttpResponse {
    let start_time = Instant::now();
    info!("Nouvelle requête de batch prediction: {} soumissions", req.len());

    if req.is_empty() {
        return error_response(&PredictorError::EmptyBatch, start_time);
    }

    let mut rows: Vec<FeatureVector> = Vec::with_capacity(req.len());
    for (i, form) in req.iter().enumerate() {
        match encode_form(form) {
            Ok(features) => rows.push(features),
            Err(e) => {
                warn!("Soumission {} invalide: {}", i + 1, e);
                let message = format!("Soumission {}: {}", i + 1, e);
                return HttpResponse::BadRequest()
                    .json(ApiResponse::<()>::error(&message).timed(start_time));
            }
        }
    }

    let model = model.get_ref().clone();
    let features = rows.clone();
    match web::block(move || inference::predict_batch(model.as_ref(), &features)).await {
        Ok(Ok(results)) => {
            info!("Batch prédiction réussie: {} résultats", results.len());
            let views: Vec<PredictionView> = results
                .into_iter()
                .zip(rows)
                .map(|(result, features)| PredictionView::new(result, features))
                .collect();
            HttpResponse::Ok().json(ApiResponse::success(views).timed(start_time))
        }
        Ok(Err(e)) => {
            error!("Erreur batch prédiction: {}", e);
            error_response(&e, start_time)
        }
        Err(e) => {
            error!("Erreur d'exécution bloquante batch: {}", e);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Erreur d'exécution").timed(start_time))
        }
    }
}

pub async fn index(req: HttpRequest, config: web::Data<ServerConfig>) -> HttpResponse {
    match NamedFile::open_async(config.static_dir.join("index.html")).await {
        Ok(file) => file.into_response(&req),
        Err(e) => {
            error!("Erreur chargement interface: {}", e);
            HttpResponse::InternalServerError().body("Erreur chargement interface")
        }
    }
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::<()>::error("Endpoint non trouvé"))
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(256 * 1024)
        .error_handler(|err, _req| {
            let message = format!("Requête invalide: {}", err);
            warn!("{}", message);
            InternalError::from_response(
                err,
                HttpResponse::BadRequest().json(ApiResponse::<()>::error(&message)),
            )
            .into()
        })
}

/// Registers the page and API routes. Static files and the fallback are added by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::get().to(index))
        .route("/api/health", web::get().to(health_check))
        .route("/api/options", web::get().to(form_options))
        .route("/api/model-info", web::get().to(model_info))
        .route("/api/predict", web::post().to(predict_usage))
        .route("/api/batch-predict", web::post().to(batch_predict));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    use crate::inference::tests::FixedModel;
    use crate::inference::LogisticClassifier;

    fn fixed(label: i64, positive: f32) -> ModelData {
        let model: Arc<dyn Classifier> = Arc::new(FixedModel {
            label,
            proba: [1.0 - positive, positive],
        });
        web::Data::new(model)
    }

    fn submission() -> Value {
        json!({
            "income": "Less than $10,000",
            "education": "Postgraduate or professional degree",
            "age": 45,
            "parent": "No",
            "married": "Yes",
            "female": "Yes"
        })
    }

    macro_rules! app {
        ($model:expr) => {
            test::init_service(
                App::new()
                    .app_data($model)
                    .app_data(web::Data::new(ServerConfig::from_lookup(|_| None)))
                    .configure(configure)
                    .default_service(web::route().to(not_found)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn predict_returns_view_with_chart() {
        let app = app!(fixed(1, 0.75));
        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(submission())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        let data = &body["data"];
        assert_eq!(data["category"], "LinkedIn User");
        assert_eq!(data["probability_pct"], "75.0%");
        assert_eq!(
            data["features"],
            json!({"income": 1, "education": 8, "parent": 0, "marital": 1, "age": 45, "female": 1})
        );
        assert_eq!(data["chart"][0]["outcome"], "Not LinkedIn User");
        assert_eq!(data["chart"][1]["outcome"], "LinkedIn User");
        assert!(body["execution_time_ms"].is_u64());
    }

    #[actix_web::test]
    async fn negative_label_reports_non_user() {
        let app = app!(fixed(0, 0.2));
        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(submission())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["category"], "Not a LinkedIn User");
        assert_eq!(body["data"]["predicted_class"], false);
    }

    #[actix_web::test]
    async fn unknown_label_is_a_bad_request() {
        let app = app!(fixed(1, 0.5));
        let mut form = submission();
        form["income"] = json!("Millionaire");
        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(form)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("Millionaire"));
    }

    #[actix_web::test]
    async fn malformed_json_gets_json_error() {
        let app = app!(fixed(1, 0.5));
        let req = test::TestRequest::post()
            .uri("/api/predict")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"income\": 3")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn model_failure_is_a_server_error() {
        struct Broken;
        impl Classifier for Broken {
            fn name(&self) -> &'static str {
                "broken"
            }
            fn predict(&self, _rows: &[FeatureVector]) -> crate::error::PredictorResult<Vec<i64>> {
                Err(anyhow::anyhow!("forme d'entrée invalide").into())
            }
            fn predict_proba(
                &self,
                _rows: &[FeatureVector],
            ) -> crate::error::PredictorResult<Vec<[f32; 2]>> {
                Err(anyhow::anyhow!("forme d'entrée invalide").into())
            }
        }

        let model: Arc<dyn Classifier> = Arc::new(Broken);
        let app = app!(web::Data::new(model));
        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(submission())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn batch_predict_with_logistic_model() {
        let model: Arc<dyn Classifier> = Arc::new(LogisticClassifier::new(
            [1.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            -10.0,
        ));
        let app = app!(web::Data::new(model));

        let mut poor = submission();
        poor["income"] = json!("Less than $10,000");
        poor["education"] = json!("Less than high school");
        let mut rich = submission();
        rich["income"] = json!("Greater than $150,000");

        let req = test::TestRequest::post()
            .uri("/api/batch-predict")
            .set_json(json!([poor, rich]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["predicted_class"], false);
        assert_eq!(data[1]["predicted_class"], true);
        assert_eq!(data[1]["features"]["income"], 9);
    }

    #[actix_web::test]
    async fn batch_reports_offending_row() {
        let app = app!(fixed(1, 0.5));
        let mut bad = submission();
        bad["age"] = json!(12);
        let req = test::TestRequest::post()
            .uri("/api/batch-predict")
            .set_json(json!([submission(), bad]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().starts_with("Soumission 2"));
    }

    #[actix_web::test]
    async fn empty_batch_is_rejected() {
        let app = app!(fixed(1, 0.5));
        let req = test::TestRequest::post()
            .uri("/api/batch-predict")
            .set_json(json!([]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn options_and_model_info() {
        let app = app!(fixed(1, 0.5));

        let req = test::TestRequest::get().uri("/api/options").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["income"].as_array().unwrap().len(), 9);
        assert_eq!(body["data"]["education"].as_array().unwrap().len(), 8);
        assert_eq!(body["data"]["age_default"], 30);

        let req = test::TestRequest::get().uri("/api/model-info").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body["data"]["features"],
            json!(["income", "education", "parent", "marital", "age", "female"])
        );
        assert_eq!(body["data"]["backend"], "fixed");
    }

    #[actix_web::test]
    async fn unknown_route_is_json_404() {
        let app = app!(fixed(1, 0.5));
        let req = test::TestRequest::get().uri("/api/nothing").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn index_serves_form_page() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<form id=\"prediction-form\"></form>").unwrap();
        let mut config = ServerConfig::from_lookup(|_| None);
        config.static_dir = dir.path().to_path_buf();

        let app = test::init_service(
            App::new()
                .app_data(fixed(1, 0.5))
                .app_data(web::Data::new(config))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        assert!(std::str::from_utf8(&body).unwrap().contains("prediction-form"));
    }
}
