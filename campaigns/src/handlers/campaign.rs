use actix_web::{
    delete, get, post,
    web::{self, Json},
};
use common::{context::Context, entities::campaign::Campaign, error};
use serde_json::{json, Value};

use crate::service::campaign::{
    CampaignOverview, CampaignService, SendCampaignRequest, SendSummary,
};

#[post("/api/campaign/send")]
pub async fn send_campaign(
    context: Context,
    Json(request): web::Json<SendCampaignRequest>,
) -> error::Result<Json<SendSummary>> {
    Ok(Json(CampaignService::new(context).send(request).await?))
}

#[post("/api/campaign/{id}/sync")]
pub async fn sync_campaign(
    context: Context,
    id: web::Path<String>,
) -> error::Result<Json<Value>> {
    let message = CampaignService::new(context).sync(id.parse()?).await?;
    Ok(Json(json! {{ "message": message }}))
}

#[get("/api/campaign/{id}")]
pub async fn get_campaign(
    context: Context,
    id: web::Path<String>,
) -> error::Result<Json<CampaignOverview>> {
    Ok(Json(CampaignService::new(context).find(id.parse()?).await?))
}

#[get("/api/campaigns")]
pub async fn get_campaigns(context: Context) -> error::Result<Json<Vec<Campaign>>> {
    Ok(Json(CampaignService::new(context).list().await?))
}

#[delete("/api/campaign/{id}")]
pub async fn delete_campaign(
    context: Context,
    id: web::Path<String>,
) -> error::Result<Json<Campaign>> {
    Ok(Json(
        CampaignService::new(context).delete(id.parse()?).await?,
    ))
}
