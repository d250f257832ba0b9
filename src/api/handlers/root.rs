use axum::response::IntoResponse;

/// Undocumented service root; useful for load balancers and curl checks.
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}
