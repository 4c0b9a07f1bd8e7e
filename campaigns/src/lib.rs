use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware, web, App,
};
use common::context::ServiceState;

pub mod handlers;
pub mod resend;
pub mod service;

use handlers::campaign::{
    delete_campaign, get_campaign, get_campaigns, send_campaign, sync_campaign,
};
use handlers::template::{
    delete_template, get_template, get_templates, patch_template, post_template,
};

pub fn create_app(
    state: Arc<ServiceState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Response = ServiceResponse<impl MessageBody>,
        Config = (),
        InitError = (),
        Error = actix_web::Error,
    >,
> {
    let cors = Cors::permissive();
    let app = App::new()
        .wrap(cors)
        .wrap(middleware::Logger::default())
        .app_data(web::Data::new(state))
        .service(send_campaign)
        .service(sync_campaign)
        .service(get_campaign)
        .service(get_campaigns)
        .service(delete_campaign)
        .service(post_template)
        .service(get_template)
        .service(get_templates)
        .service(patch_template)
        .service(delete_template);
    app
}
