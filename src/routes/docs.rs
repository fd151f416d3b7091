//! API documentation routes.

use axum::{response::Html, routing::get, Json, Router};
use utoipa::openapi::OpenApi;

const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Swagger UI bundle version loaded by the docs page.
const SWAGGER_UI_VERSION: &str = "5.17.14";

async fn openapi_json() -> Json<OpenApi> {
    Json(crate::docs::openapi().clone())
}

async fn swagger_ui() -> Html<String> {
    Html(format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Sales API</title>
<link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@{v}/swagger-ui.css">
</head>
<body>
<div id="swagger-ui"></div>
<script src="https://unpkg.com/swagger-ui-dist@{v}/swagger-ui-bundle.js"></script>
<script>
window.ui = SwaggerUIBundle({{ url: "{spec}", dom_id: "#swagger-ui" }});
</script>
</body>
</html>
"##,
        v = SWAGGER_UI_VERSION,
        spec = OPENAPI_PATH
    ))
}

/// GET /api-docs (interactive UI) and GET /api-docs/openapi.json
pub fn docs_routes() -> Router {
    Router::new()
        .route("/api-docs", get(swagger_ui))
        .route(OPENAPI_PATH, get(openapi_json))
}
