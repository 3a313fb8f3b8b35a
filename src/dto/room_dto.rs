use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::models::reservation::DetailKind;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    #[validate(length(max = 150))]
    pub location: Option<String>,

    #[validate(range(min = 1, max = 10000))]
    pub max_capacity: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoomRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    #[validate(length(max = 150))]
    pub location: Option<String>,

    #[validate(range(min = 1, max = 10000))]
    pub max_capacity: Option<i32>,

    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CapacityRequest {
    #[validate(range(min = 1))]
    pub setup_type_id: i32,

    #[validate(range(min = 1, max = 10000))]
    pub capacity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CostRequest {
    #[validate(range(min = 1))]
    pub cost_type_id: i32,

    #[validate(custom = "crate::utils::validation::validate_non_negative")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddonRequest {
    pub kind: DetailKind,

    #[validate(range(min = 1))]
    pub item_id: i32,
}

// Request común para los catálogos simples
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CatalogItemRequest {
    #[validate(
        length(min = 2, max = 100),
        custom = "crate::utils::validation::validate_not_blank"
    )]
    pub name: String,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    pub active: Option<bool>,
}
