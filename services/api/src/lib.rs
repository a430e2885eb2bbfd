pub mod error;
pub mod extractors;
pub mod middleware;
pub mod responses;
pub mod routes;
pub mod schemas;
pub mod state;

use actix_web::{App, HttpResponse, web};

/// The app with every route and the JWT middleware; `main` wraps it with
/// CORS, rate limiting and request logging, tests drive it directly.
pub fn create_app(
    state: state::AppState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .configure(routes::configure)
        .default_service(web::to(|| async {
            HttpResponse::NotFound()
                .json(serde_json::json!({ "success": false, "message": "not found" }))
        }))
        .wrap(middleware::JwtAuth)
}
