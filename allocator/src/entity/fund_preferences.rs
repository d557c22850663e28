use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fund_preferences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub reviewer_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub fund_id: Uuid,
    pub scope: String,
    pub max_reviews: Option<i32>,
    #[sea_orm(column_type = "JsonBinary")]
    pub selected_categories: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub excluded_proposals: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
