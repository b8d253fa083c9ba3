use actix_multipart::{Multipart, MultipartError};
use actix_web::body::MessageBody;
use actix_web::dev::{Server, Service as _, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::{header, StatusCode};
use actix_web::{
    get, post, web, App, HttpMessage, HttpRequest, HttpResponse, HttpServer, Responder,
    ResponseError,
};
use futures_util::StreamExt as _;
use serde::Deserialize;
use uuid::Uuid;

use crate::application::{ColumnStatsUseCase, StatsRequest, UploadedFile};
use crate::domain::error::AppError;
use crate::infrastructure::config::ServerConfig;

const LOG_SOURCE: &str = "HttpApi";

/// Multipart field carrying the CSV upload
const FILE_FIELD: &str = "file";

pub struct HttpState {
    pub stats: ColumnStatsUseCase,
    pub max_body_bytes: usize,
}

impl HttpState {
    pub fn new(stats: ColumnStatsUseCase, max_body_bytes: usize) -> Self {
        Self {
            stats,
            max_body_bytes,
        }
    }
}

/// Per-request id attached by the logging middleware
#[derive(Debug, Clone, Copy)]
struct RequestId(Uuid);

#[derive(Deserialize)]
struct StatsPath {
    column_name: String,
    separator: String,
}

/// Parts of a multipart body the stats route cares about
#[derive(Debug, Default)]
struct Upload {
    file: Option<UploadedFile>,
    form: Vec<(String, String)>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(AppError::status_code(self))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(ResponseError::status_code(self))
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

#[get("/health/")]
async fn health(data: web::Data<HttpState>) -> impl Responder {
    HttpResponse::Ok().json(data.stats.health_check())
}

#[get("/logs/")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    HttpResponse::Ok().json(data.stats.log().entries())
}

#[post("/stats/{column_name}/{separator}/")]
async fn column_stats(
    req: HttpRequest,
    data: web::Data<HttpState>,
    path: web::Path<StatsPath>,
    payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    let StatsPath {
        column_name,
        separator,
    } = path.into_inner();
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.to_string())
        .unwrap_or_default();

    let upload = match read_upload(&req, payload, data.max_body_bytes).await {
        Ok(upload) => upload,
        Err(e) => {
            data.stats.log().error(
                LOG_SOURCE,
                &format!("Failed to read upload (request_id={}): {}", request_id, e),
            );
            return Err(e);
        }
    };

    data.stats.log().info(
        LOG_SOURCE,
        &format!(
            "Form Data: {:?} file={:?} (request_id={})",
            upload.form,
            upload.file.as_ref().map(|f| f.file_name.as_str()),
            request_id
        ),
    );

    let request = StatsRequest {
        column_name,
        separator,
        file: upload.file,
    };

    // CSV parsing is CPU bound, keep it off the async workers
    let stats = data.stats.clone();
    let result = web::block(move || stats.compute_column_stats(&request))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(result))
}

/// Collect the `file` part and plain form fields of a multipart body.
/// Anything that is not multipart simply has no file.
async fn read_upload(
    req: &HttpRequest,
    payload: web::Payload,
    limit: usize,
) -> Result<Upload, AppError> {
    if content_length(req).is_some_and(|len| len > limit) {
        return Err(AppError::PayloadTooLarge(limit));
    }

    if !is_multipart(req) {
        return Ok(Upload::default());
    }

    let mut multipart = Multipart::new(req.headers(), payload);
    let mut upload = Upload::default();
    let mut received = 0usize;

    while let Some(field) = multipart.next().await {
        let mut field = field.map_err(multipart_error)?;
        let (name, file_name) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().map(str::to_string),
                cd.get_filename().map(str::to_string),
            ),
            None => (None, None),
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(multipart_error)?;
            received += chunk.len();
            if received > limit {
                return Err(AppError::PayloadTooLarge(limit));
            }
            bytes.extend_from_slice(&chunk);
        }

        match (name, file_name) {
            (Some(name), Some(file_name)) if name == FILE_FIELD && upload.file.is_none() => {
                upload.file = Some(UploadedFile { file_name, bytes });
            }
            (Some(name), None) => {
                upload
                    .form
                    .push((name, String::from_utf8_lossy(&bytes).into_owned()));
            }
            _ => {}
        }
    }

    Ok(upload)
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::ParseError(format!("Invalid multipart body: {}", err))
}

fn content_length(req: &HttpRequest) -> Option<usize> {
    req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().starts_with("multipart/"))
}

/// Routes plus the request-logging middleware
pub fn build_app(
    state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Response = ServiceResponse<impl MessageBody>,
        Config = (),
        InitError = (),
        Error = actix_web::Error,
    >,
> {
    let log = state.stats.log().clone();

    App::new()
        .app_data(state)
        .wrap_fn(move |req: ServiceRequest, srv| {
            let request_id = Uuid::new_v4();
            let conn = req.connection_info().clone();
            let content_type = req
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-")
                .to_string();

            log.info(
                LOG_SOURCE,
                &format!(
                    "Request: {} {}://{}{} (request_id={} content_type={})",
                    req.method(),
                    conn.scheme(),
                    conn.host(),
                    req.uri(),
                    request_id,
                    content_type
                ),
            );
            req.extensions_mut().insert(RequestId(request_id));
            srv.call(req)
        })
        .service(health)
        .service(get_logs)
        .service(column_stats)
}

pub fn start_server(config: &ServerConfig, state: web::Data<HttpState>) -> std::io::Result<Server> {
    let server = HttpServer::new(move || build_app(state.clone()))
        .bind((config.host.clone(), config.port))?
        .run();

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::logging::RequestLog;
    use actix_web::test;

    const BOUNDARY: &str = "zeitindex-test-boundary";
    const SAMPLE: &str = "PID;Zeitindex;X\n1;A;10 units\n2;A;20\n3;B;5x\n";

    fn state(limit: usize) -> web::Data<HttpState> {
        web::Data::new(HttpState::new(
            ColumnStatsUseCase::new(RequestLog::new(100)),
            limit,
        ))
    }

    fn multipart_body(file_name: &str, content: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nmonthly\r\n",
                BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: text/csv\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload_request(uri: &str, file_name: &str, content: &[u8]) -> test::TestRequest {
        test::TestRequest::post()
            .uri(uri)
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(multipart_body(file_name, content))
    }

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(build_app(state(1024))).await;
        let req = test::TestRequest::get().uri("/health/").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: String = test::read_body_json(resp).await;
        assert_eq!(body, "OK!");
    }

    #[actix_web::test]
    async fn test_stats_success() {
        let app = test::init_service(build_app(state(1024))).await;
        let req = upload_request("/stats/X/;/", "data.csv", SAMPLE.as_bytes()).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(
            body,
            serde_json::json!({
                "Summe pro Zeiteinheit": {"A": 30, "B": 5},
                "Durchschnitt pro Zeiteinheit": {"A": 15.0, "B": 5.0}
            })
        );
    }

    #[actix_web::test]
    async fn test_numeric_time_index_order_in_body() {
        let app = test::init_service(build_app(state(1024))).await;
        let req = upload_request("/stats/X/,/", "data.csv", b"PID,Zeitindex,X\n1,1,1\n2,2,2\n3,10,3\n")
            .to_request();
        let body = test::call_and_read_body(&app, req).await;

        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            r#"{"Summe pro Zeiteinheit":{"1":1,"2":2,"10":3},"Durchschnitt pro Zeiteinheit":{"1":1.0,"2":2.0,"10":3.0}}"#
        );
    }

    #[actix_web::test]
    async fn test_row_of_empty_fields_is_500() {
        let app = test::init_service(build_app(state(1024))).await;
        let req = upload_request("/stats/X/,/", "data.csv", b"PID,Zeitindex,X\n1,A,10\n,,\n")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_missing_file_part() {
        let app = test::init_service(build_app(state(1024))).await;
        let req = test::TestRequest::post().uri("/stats/X/;/").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status().as_u16(), 403);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "No file part in the request");
    }

    #[actix_web::test]
    async fn test_client_error_statuses() {
        let app = test::init_service(build_app(state(1024))).await;

        let req = upload_request("/stats/X/;/", "data.txt", SAMPLE.as_bytes()).to_request();
        assert_eq!(test::call_service(&app, req).await.status().as_u16(), 404);

        let req = upload_request("/stats/X/;/", "data.csv", b"PID;X\n1;2\n").to_request();
        assert_eq!(test::call_service(&app, req).await.status().as_u16(), 405);

        let req = upload_request("/stats/Y/;/", "data.csv", SAMPLE.as_bytes()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 406);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "File does not contain the entered column: Y");
    }

    #[actix_web::test]
    async fn test_empty_upload_is_500() {
        let app = test::init_service(build_app(state(1024))).await;
        let req = upload_request("/stats/X/;/", "data.csv", b"").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("No columns to parse"));
    }

    #[actix_web::test]
    async fn test_non_numeric_value_is_500() {
        let app = test::init_service(build_app(state(1024))).await;
        let req = upload_request("/stats/X/,/", "data.csv", b"PID,Zeitindex,X\n1,A,abc\n")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_oversized_upload_is_rejected() {
        let app = test::init_service(build_app(state(16))).await;
        let req = upload_request("/stats/X/;/", "data.csv", SAMPLE.as_bytes()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[actix_web::test]
    async fn test_requests_are_logged() {
        let data = state(1024);
        let app = test::init_service(build_app(data.clone())).await;
        let req = upload_request("/stats/X/;/", "data.csv", SAMPLE.as_bytes()).to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get().uri("/logs/").to_request();
        let entries: Vec<crate::infrastructure::logging::LogEntry> =
            test::call_and_read_body_json(&app, req).await;

        assert!(entries[0].message.starts_with("Request: POST "));
        assert!(entries[0].message.contains("/stats/X/;/"));
        assert!(entries
            .iter()
            .any(|e| e.message.contains("Form Data") && e.message.contains("monthly")));
        assert!(entries.iter().any(|e| e.source == "ColumnStats"));
    }
}
