use std::env;
use std::sync::Arc;

use actix_web::HttpServer;
use campaigns::create_app;
use campaigns::resend::{MailProviderObject, ResendClient};
use common::context::ServiceState;
use common::entities::{
    agent::Agent,
    campaign::Campaign,
    contact::Contact,
    owner::{Owner, OwnerContact},
    sent_email::SentEmail,
    template::EmailTemplate,
    trademark::Trademark,
};
use common::repository::mongo_repository::MongoRepository;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let mongo_uri = env::var("MONGOURI").unwrap();
    let database = "campaigns";

    let mut state = ServiceState::new("campaigns".to_string());
    state.insert::<Agent>(Arc::new(
        MongoRepository::new(&mongo_uri, database, "agents").await,
    ));
    state.insert::<Contact>(Arc::new(
        MongoRepository::new(&mongo_uri, database, "contacts").await,
    ));
    state.insert::<Owner>(Arc::new(
        MongoRepository::new(&mongo_uri, database, "owners").await,
    ));
    state.insert::<OwnerContact>(Arc::new(
        MongoRepository::new(&mongo_uri, database, "owner_contacts").await,
    ));
    state.insert::<Trademark>(Arc::new(
        MongoRepository::new(&mongo_uri, database, "trademarks").await,
    ));
    state.insert::<EmailTemplate>(Arc::new(
        MongoRepository::new(&mongo_uri, database, "templates").await,
    ));
    state.insert::<Campaign>(Arc::new(
        MongoRepository::new(&mongo_uri, database, "campaigns").await,
    ));
    state.insert::<SentEmail>(Arc::new(
        MongoRepository::new(&mongo_uri, database, "sent_emails").await,
    ));

    let provider: MailProviderObject = Arc::new(ResendClient::from_env());
    state.insert_manual(provider);

    let state = Arc::new(state);

    HttpServer::new(move || create_app(state.clone()))
        .bind(("0.0.0.0", 3009))?
        .run()
        .await
}
