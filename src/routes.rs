use actix_web::web;

use crate::handlers::products;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // No method or path filtering: every request lists products.
    cfg.service(web::resource("/{tail:.*}").to(products::list));
}
