use actix_web::{
    delete, get, patch, post,
    web::{self, Json},
};
use common::{
    context::Context,
    entities::template::{CreateTemplate, EmailTemplate, TemplateChange},
    error,
};

use crate::service::template::TemplateService;

#[post("/api/template")]
pub async fn post_template(
    context: Context,
    Json(data): web::Json<CreateTemplate>,
) -> error::Result<Json<EmailTemplate>> {
    Ok(Json(TemplateService::new(context).create(data).await?))
}

#[get("/api/template/{id}")]
pub async fn get_template(
    context: Context,
    id: web::Path<String>,
) -> error::Result<Json<EmailTemplate>> {
    Ok(Json(TemplateService::new(context).find(id.parse()?).await?))
}

#[get("/api/templates")]
pub async fn get_templates(context: Context) -> error::Result<Json<Vec<EmailTemplate>>> {
    Ok(Json(TemplateService::new(context).list().await?))
}

#[patch("/api/template/{id}")]
pub async fn patch_template(
    context: Context,
    id: web::Path<String>,
    Json(data): web::Json<TemplateChange>,
) -> error::Result<Json<EmailTemplate>> {
    Ok(Json(
        TemplateService::new(context).change(id.parse()?, data).await?,
    ))
}

#[delete("/api/template/{id}")]
pub async fn delete_template(
    context: Context,
    id: web::Path<String>,
) -> error::Result<Json<EmailTemplate>> {
    Ok(Json(
        TemplateService::new(context).delete(id.parse()?).await?,
    ))
}
