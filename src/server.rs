use std::{
    io::Result,
    path::{Path, PathBuf},
};

use actix_cors::Cors;
use percent_encoding::percent_decode_str;
use actix_web::{
    http::{header, Method},
    middleware::Compress,
    web::{self, resource},
    App, HttpRequest, HttpResponse, HttpServer,
};

use crate::core::settings::Settings;

const INDEX_FILE: &str = "index.html";
const IMMUTABLE_EXTENSIONS: [&str; 9] = ["js", "css", "woff", "woff2", "avif", "webp", "png", "jpg", "svg"];
const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";
const ENTRY_CACHE: &str = "public, max-age=60, stale-while-revalidate=300";

/// The compiled site being served.
#[derive(Clone, Debug)]
pub struct SiteRoot {
    root: PathBuf,
}

impl SiteRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        SiteRoot { root: root.into() }
    }

    pub fn index(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    /// Maps a raw request path to an existing file under the root. Segments
    /// are percent-decoded first. Anything else, including directories and
    /// `..` segments, is left to the SPA fallback.
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for raw in request_path.split('/').filter(|segment| !segment.is_empty()) {
            let segment = percent_decode_str(raw).decode_utf8().ok()?;
            if segment == "." || segment == ".." || segment.contains(['/', '\\', '\0']) {
                return None;
            }
            path.push(&*segment);
        }
        if path.is_file() {
            Some(path)
        } else {
            None
        }
    }
}

pub fn cache_control_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
    if IMMUTABLE_EXTENSIONS.contains(&extension) {
        Some(IMMUTABLE_CACHE)
    } else if path.file_name().and_then(|name| name.to_str()) == Some(INDEX_FILE) {
        Some(ENTRY_CACHE)
    } else {
        None
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()).unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" | "map" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

pub async fn start_server(settings: &Settings) -> Result<()> {
    let site = web::Data::new(SiteRoot::new(&settings.dist_path.value));
    if !site.index().is_file() {
        tracing::warn!(index = %site.index().display(), "Entry point is missing, fallback routes will 404");
    }
    let addr = settings.addr();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(site.clone())
            .configure(configure)
            .wrap(Compress::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_header()
                    .allow_any_method(),
            )
    })
    .bind(addr)?;
    tracing::info!("Server running on http://{}", addr);
    server.run().await
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(resource("/status").route(web::get().to(status_handler)))
        .default_service(web::route().to(static_handler));
}

async fn static_handler(req: HttpRequest, site: web::Data<SiteRoot>) -> HttpResponse {
    if req.method() != Method::GET && req.method() != Method::HEAD {
        return HttpResponse::MethodNotAllowed()
            .insert_header((header::ALLOW, "GET, HEAD"))
            .finish();
    }
    let path = match site.resolve(req.path()) {
        Some(path) => path,
        None => site.index(),
    };
    send_file(path).await
}

async fn send_file(path: PathBuf) -> HttpResponse {
    let read_path = path.clone();
    match web::block(move || std::fs::read(read_path)).await {
        Ok(Ok(body)) => {
            let mut response = HttpResponse::Ok();
            response.insert_header((header::CONTENT_TYPE, content_type_for(&path)));
            // Fallback responses are the entry point and carry its policy.
            if let Some(cache_control) = cache_control_for(&path) {
                response.insert_header((header::CACHE_CONTROL, cache_control));
            }
            response.body(body)
        }
        Ok(Err(error)) => {
            tracing::error!(path = %path.display(), "Failed to read file: {}", error);
            if error.kind() == std::io::ErrorKind::NotFound {
                HttpResponse::NotFound().body("Not found.")
            } else {
                HttpResponse::InternalServerError().body("Failed to read file.")
            }
        }
        Err(error) => {
            tracing::error!(path = %path.display(), "Blocking read failed: {}", error);
            HttpResponse::InternalServerError().body("Failed to read file.")
        }
    }
}

async fn status_handler() -> HttpResponse {
    HttpResponse::Ok().body("folio-site is running")
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{
        dev::ServiceResponse,
        http::StatusCode,
        test::{self, TestRequest},
    };
    use std::fs;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<html>folio</html>").unwrap();
        fs::write(dir.path().join("main-ABC123.js"), "console.log('folio');".repeat(50)).unwrap();
        fs::create_dir_all(dir.path().join("assets/data")).unwrap();
        fs::write(dir.path().join("assets/data/Projects_en.json"), "[]").unwrap();
        dir
    }

    macro_rules! app {
        ($root:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(SiteRoot::new($root)))
                    .configure(configure)
                    .wrap(Compress::default()),
            )
            .await
        };
    }

    fn header_value<B>(response: &ServiceResponse<B>, name: header::HeaderName) -> Option<String> {
        response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    #[actix_web::test]
    async fn hashed_assets_are_cached_for_a_year() {
        let dir = site();
        let app = app!(dir.path());
        let response = test::call_service(&app, TestRequest::get().uri("/main-ABC123.js").to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_value(&response, header::CACHE_CONTROL).as_deref(), Some(IMMUTABLE_CACHE));
        assert_eq!(
            header_value(&response, header::CONTENT_TYPE).as_deref(),
            Some("text/javascript; charset=utf-8")
        );
    }

    #[actix_web::test]
    async fn entry_point_and_unknown_routes_get_index() {
        let dir = site();
        let app = app!(dir.path());
        for uri in ["/", "/project/3", "/assets", "/../index.html"] {
            let response = test::call_service(&app, TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
            assert_eq!(header_value(&response, header::CACHE_CONTROL).as_deref(), Some(ENTRY_CACHE));
            let body = test::read_body(response).await;
            assert_eq!(body, "<html>folio</html>");
        }
    }

    #[actix_web::test]
    async fn data_files_are_served_without_long_cache() {
        let dir = site();
        let app = app!(dir.path());
        let response = test::call_service(
            &app,
            TestRequest::get().uri("/assets/data/Projects_en.json").to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_value(&response, header::CACHE_CONTROL), None);
        assert_eq!(test::read_body(response).await, "[]");
    }

    #[actix_web::test]
    async fn responses_are_gzipped_when_accepted() {
        let dir = site();
        let app = app!(dir.path());
        let request = TestRequest::get()
            .uri("/main-ABC123.js")
            .insert_header((header::ACCEPT_ENCODING, "gzip"))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(header_value(&response, header::CONTENT_ENCODING).as_deref(), Some("gzip"));
    }

    #[actix_web::test]
    async fn rejects_writes_and_reports_status() {
        let dir = site();
        let app = app!(dir.path());
        let response = test::call_service(&app, TestRequest::post().uri("/").to_request()).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(header_value(&response, header::ALLOW).as_deref(), Some("GET, HEAD"));

        let response = test::call_service(&app, TestRequest::get().uri("/status").to_request()).await;
        assert_eq!(test::read_body(response).await, "folio-site is running");
    }

    #[actix_web::test]
    async fn missing_index_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(dir.path());
        let response = test::call_service(&app, TestRequest::get().uri("/anything").to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn percent_encoded_asset_names_are_decoded() {
        let dir = site();
        fs::create_dir_all(dir.path().join("assets/img")).unwrap();
        fs::write(dir.path().join("assets/img/my shot.png"), "PNGDATA").unwrap();
        fs::write(dir.path().join("assets/img/café.svg"), "<svg/>").unwrap();
        let app = app!(dir.path());

        let response = test::call_service(&app, TestRequest::get().uri("/assets/img/my%20shot.png").to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_value(&response, header::CONTENT_TYPE).as_deref(), Some("image/png"));
        assert_eq!(header_value(&response, header::CACHE_CONTROL).as_deref(), Some(IMMUTABLE_CACHE));
        assert_eq!(test::read_body(response).await, "PNGDATA");

        let response = test::call_service(&app, TestRequest::get().uri("/assets/img/caf%C3%A9.svg").to_request()).await;
        assert_eq!(test::read_body(response).await, "<svg/>");
    }

    #[test]
    fn encoded_traversal_falls_back() {
        let dir = site();
        let root = SiteRoot::new(dir.path());
        assert_eq!(root.resolve("/%2e%2e/index.html"), None);
        assert_eq!(root.resolve("/assets%2fdata/Projects_en.json"), None);
        assert_eq!(root.resolve("/%FF.js"), None);
        assert_eq!(
            root.resolve("/assets/data/Projects%5Fen.json"),
            Some(dir.path().join("assets/data/Projects_en.json"))
        );
    }

    #[test]
    fn cache_policy_by_file() {
        assert_eq!(cache_control_for(Path::new("fonts/inter.woff2")), Some(IMMUTABLE_CACHE));
        assert_eq!(cache_control_for(Path::new("index.html")), Some(ENTRY_CACHE));
        assert_eq!(cache_control_for(Path::new("assets/i18n/en.json")), None);
        assert_eq!(content_type_for(Path::new("logo.svg")), "image/svg+xml");
    }
}
