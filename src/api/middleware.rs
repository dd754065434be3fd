// Logging, compression and CORS for the diamond API

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{Compress, Logger};

/// Request log line without the Authorization header or query string.
const LOG_FORMAT: &str = r#"%a "%m %U" %s %b %T"#;

pub fn setup_middleware() -> (Logger, Compress) {
    let logger = Logger::new(LOG_FORMAT);
    let compress = Compress::default();
    (logger, compress)
}

/// Product pages call through the storefront backend, so only GET/POST are needed.
pub fn setup_cors(allowed_origins: &str) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
        ])
        .max_age(3600);

    for origin in allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
    {
        cors = cors.allowed_origin(origin);
    }

    cors
}
