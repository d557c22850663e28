use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reviewers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub primary_expertise: String,
    pub technical_level: Option<i16>,
    pub product_level: Option<i16>,
    pub community_level: Option<i16>,
    #[sea_orm(column_type = "JsonBinary")]
    pub interests: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub affiliated_proposals: Json,
    pub active_reviews: i32,
    pub max_capacity: i32,
    pub active_peer_reviews: i32,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
