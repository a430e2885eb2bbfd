use actix_web::web;

pub mod auth;
pub mod donations;
pub mod notifications;
pub mod requests;
pub mod users;

/// Registers every route. Fixed-path routes go in before `{id}` matchers so
/// `/requests/nearby` is never parsed as a request id.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(auth::register)
        .service(auth::login)
        .service(auth::send_otp)
        .service(auth::login_otp)
        .service(auth::refresh)
        .service(auth::change_password)
        .service(auth::logout)
        .service(auth::me)
        .service(requests::list)
        .service(requests::nearby)
        .service(requests::urgent)
        .service(requests::accepted)
        .service(requests::completed)
        .service(requests::mine)
        .service(requests::create)
        .service(requests::accept)
        .service(requests::get)
        .service(requests::update)
        .service(requests::set_status)
        .service(requests::remove)
        .service(donations::list)
        .service(donations::mine)
        .service(donations::donor_stats)
        .service(donations::create)
        .service(donations::get)
        .service(donations::update)
        .service(donations::set_status)
        .service(donations::remove)
        .service(users::donors)
        .service(users::hospitals)
        .service(users::search_donors)
        .service(users::overview)
        .service(users::update_profile)
        .service(users::get)
        .service(notifications::list)
        .service(notifications::mark_read)
        .service(notifications::mark_all_read);
}
