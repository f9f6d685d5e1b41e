use actix_web::{http::header, web, HttpResponse};
use tracing::debug;

use crate::error::AppResult;
use crate::state::AppState;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Lists every product as a JSON array.
///
/// Store and serialization failures become an empty `500`; the body is only
/// written once the whole array has been serialized.
pub async fn list(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let products = state.products.list().await?;
    let body = serde_json::to_vec(&products)?;

    debug!("Listing {} products", products.len());

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, JSON_CONTENT_TYPE))
        .body(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::product::Product;
    use crate::routes::configure_routes;
    use crate::services::product::testing::{product, FakeStore};
    use actix_web::{http::StatusCode, test, App};

    async fn call(
        store: FakeStore,
        req: test::TestRequest,
    ) -> (StatusCode, Option<String>, web::Bytes) {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(store)))
                .configure(configure_routes),
        )
        .await;

        let resp = test::call_service(&app, req.to_request()).await;
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = test::read_body(resp).await;
        (status, content_type, body)
    }

    #[actix_web::test]
    async fn test_lists_stored_products() {
        let stored = vec![
            product(0xa1, "Widget", 500, 10),
            product(0xa2, "Gadget", 1200, 3),
        ];
        let (status, content_type, body) = call(
            FakeStore::with_products(stored.clone()),
            test::TestRequest::get().uri("/"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(JSON_CONTENT_TYPE));

        let listed: Vec<Product> = serde_json::from_slice(&body).unwrap();
        assert_eq!(listed, stored);

        let raw: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(raw[0]["name"], "Widget");
        assert_eq!(raw[0]["cost"], 500);
        assert_eq!(raw[0]["quantity"], 10);
        assert_eq!(raw[1]["cost"], 1200);
        assert!(raw[1]["date_created"].is_string());
        assert!(raw[1]["product_id"].is_string());
    }

    #[actix_web::test]
    async fn test_empty_store_returns_empty_array() {
        let (status, _, body) =
            call(FakeStore::default(), test::TestRequest::get().uri("/")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"[]");
    }

    #[actix_web::test]
    async fn test_store_failure_returns_empty_500() {
        let (status, content_type, body) =
            call(FakeStore::failing(), test::TestRequest::get().uri("/")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_ne!(content_type.as_deref(), Some(JSON_CONTENT_TYPE));
        assert!(body.is_empty());
    }

    #[actix_web::test]
    async fn test_any_method_and_path_is_routed_to_listing() {
        let store = FakeStore::with_products(vec![product(1, "Widget", 500, 10)]);

        let (status, _, body) = call(
            store.clone(),
            test::TestRequest::post().uri("/v1/products"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let listed: Vec<Product> = serde_json::from_slice(&body).unwrap();
        assert_eq!(listed.len(), 1);

        let (status, _, _) =
            call(store, test::TestRequest::delete().uri("/anything/else")).await;
        assert_eq!(status, StatusCode::OK);
    }
}
