//! AI content endpoints.
//!
//! Outcomes are returned with 200 either way; the `success` flag carries
//! whether the model answered.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::RequireAdminAuth;
use crate::services::openai::{
    AiOutcome, ComposeRequest, ComposedEmail, Description, ImageOptions, Images, Insights,
    MarketingContent, ProductSuggestion, SalesItem, SuggestRequest,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ai/image", post(image))
        .route("/ai/description", post(description))
        .route("/ai/marketing", post(marketing))
        .route("/ai/sales-analysis", post(sales_analysis))
        .route("/ai/email", post(compose_email))
        .route("/products/ai/suggest", post(suggest))
}

#[derive(Debug, Deserialize)]
pub struct DescriptionRequest {
    #[serde(alias = "productName")]
    pub product_name: String,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarketingRequest {
    #[serde(alias = "productName")]
    pub product_name: String,
    #[serde(alias = "targetAudience")]
    pub target_audience: String,
    #[serde(alias = "campaignType")]
    pub campaign_type: String,
}

/// Either `{"items": [...]}` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SalesAnalysisRequest {
    Wrapped {
        #[serde(alias = "salesData")]
        items: Vec<SalesItem>,
    },
    Bare(Vec<SalesItem>),
}

impl SalesAnalysisRequest {
    fn into_items(self) -> Vec<SalesItem> {
        match self {
            Self::Wrapped { items } | Self::Bare(items) => items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ComposeResponse {
    pub email: ComposedEmail,
}

fn required(value: &str, name: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{name} is required")));
    }
    Ok(())
}

#[instrument(skip_all, fields(admin_id = %admin.id))]
async fn image(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Json(options): Json<ImageOptions>,
) -> Result<Json<AiOutcome<Images>>, AppError> {
    required(&options.prompt, "prompt")?;
    Ok(Json(state.ai().generate_product_image(&options).await))
}

#[instrument(skip_all, fields(admin_id = %admin.id))]
async fn description(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Json(body): Json<DescriptionRequest>,
) -> Result<Json<AiOutcome<Description>>, AppError> {
    required(&body.product_name, "product_name")?;
    Ok(Json(
        state
            .ai()
            .generate_product_description(&body.product_name, &body.features)
            .await,
    ))
}

#[instrument(skip_all, fields(admin_id = %admin.id))]
async fn marketing(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Json(body): Json<MarketingRequest>,
) -> Result<Json<AiOutcome<MarketingContent>>, AppError> {
    required(&body.product_name, "product_name")?;
    Ok(Json(
        state
            .ai()
            .generate_marketing_content(&body.product_name, &body.target_audience, &body.campaign_type)
            .await,
    ))
}

/// Title, description and tags for a product listing.
#[instrument(skip_all, fields(admin_id = %admin.id))]
async fn suggest(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Json(body): Json<SuggestRequest>,
) -> Result<Json<AiOutcome<ProductSuggestion>>, AppError> {
    required(&body.title, "title")?;
    Ok(Json(state.ai().suggest_product_copy(&body).await))
}

#[instrument(skip_all, fields(admin_id = %admin.id))]
async fn sales_analysis(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Json(body): Json<SalesAnalysisRequest>,
) -> Json<AiOutcome<Insights>> {
    let items = body.into_items();
    tracing::debug!(items = items.len(), "Analyzing sales data");
    Json(state.ai().analyze_sales_data(&items).await)
}

/// Compose a product offer or newsletter email.
#[instrument(skip_all, fields(admin_id = %admin.id, kind = ?request.kind))]
async fn compose_email(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Json(request): Json<ComposeRequest>,
) -> Result<Json<ComposeResponse>, AppError> {
    let today = chrono::Local::now().date_naive();
    let email = state
        .ai()
        .compose_email(request, &state.branding(), today)
        .await?;
    Ok(Json(ComposeResponse { email }))
}
