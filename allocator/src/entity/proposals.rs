use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "proposals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub fund_id: Uuid,
    pub title: String,
    pub category: String,
    pub primary_tag: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub detailed_tags: Json,
    pub current_reviews: i32,
    pub min_required_reviews: i32,
    #[sea_orm(column_type = "Double")]
    pub requested_funding: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
