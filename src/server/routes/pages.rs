use crate::server::router::AppState;
use axum::{Router, handler::HandlerWithoutStateExt, response::Redirect};
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};

async fn redirect_home() -> Redirect {
    Redirect::to("/")
}

/// Page routes plus the static asset tree. Unknown paths go back to the storefront.
pub fn with_pages(router: Router<AppState>, static_dir: &Path) -> Router<AppState> {
    let assets = ServeDir::new(static_dir).fallback(redirect_home.into_service());

    router
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route_service("/signup", ServeFile::new(static_dir.join("signup.html")))
        .route_service("/login", ServeFile::new(static_dir.join("login.html")))
        .fallback_service(assets)
}
