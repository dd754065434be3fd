// Bearer-secret guard: only the storefront backend may call the diamond endpoints.

use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

use crate::api::models::{ApiResponse, ErrorDetail};

/// Paths reachable without the secret.
const PUBLIC_PATHS: &[&str] = &["/health", "/"];

pub struct Auth {
    secret: String,
}

impl Auth {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Auth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddleware {
            service,
            secret: self.secret.clone(),
        }))
    }
}

pub struct AuthMiddleware<S> {
    service: S,
    secret: String,
}

impl<S> AuthMiddleware<S> {
    fn authorized(&self, req: &ServiceRequest) -> bool {
        if PUBLIC_PATHS.contains(&req.path()) {
            return true;
        }
        // An empty secret would accept "Bearer " on its own.
        if self.secret.is_empty() {
            return false;
        }
        req.headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .is_some_and(|token| token.trim() == self.secret)
    }
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.authorized(&req) {
            let fut = self.service.call(req);
            return Box::pin(async move {
                let res = fut.await?;
                Ok(res.map_into_left_body())
            });
        }

        tracing::debug!(path = %req.path(), "Rejected request without valid API secret");
        Box::pin(async move {
            let detail = ErrorDetail::new(
                "unauthorized",
                "Invalid or missing authentication token",
            );
            let response = HttpResponse::Unauthorized()
                .json(ApiResponse::<()>::error(detail))
                .map_into_right_body();
            Ok(req.into_response(response))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn rejects_missing_or_wrong_secret() {
        let app = test::init_service(
            App::new()
                .wrap(Auth::new("s3cret".into()))
                .route("/health", web::get().to(ok))
                .route("/api/v1/diamonds/search", web::post().to(ok)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/diamonds/search")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 401);

        let req = test::TestRequest::post()
            .uri("/api/v1/diamonds/search")
            .insert_header((header::AUTHORIZATION, "Bearer nope"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let req = test::TestRequest::post()
            .uri("/api/v1/diamonds/search")
            .insert_header((header::AUTHORIZATION, "Bearer s3cret"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::get().uri("/health").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
    }

    #[actix_web::test]
    async fn empty_secret_locks_everything_but_health() {
        let app = test::init_service(
            App::new()
                .wrap(Auth::new(String::new()))
                .route("/health", web::get().to(ok))
                .route("/api/v1/diamonds/refine", web::post().to(ok)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/diamonds/refine")
            .insert_header((header::AUTHORIZATION, "Bearer "))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let req = test::TestRequest::get().uri("/health").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
    }
}
