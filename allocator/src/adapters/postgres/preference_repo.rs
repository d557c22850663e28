//! PostgreSQL adapter for PreferenceRepository

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use super::{counter, from_json};
use crate::domain::entities::{FundId, FundPreferences, ReviewScope, ReviewerId};
use crate::domain::ports::PreferenceRepository;
use crate::entity::fund_preferences;
use crate::error::DomainError;

/// PostgreSQL implementation of PreferenceRepository
pub struct PostgresPreferenceRepository {
    db: DatabaseConnection,
}

impl PostgresPreferenceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PreferenceRepository for PostgresPreferenceRepository {
    async fn find_by_fund(&self, fund_id: &FundId) -> Result<Vec<FundPreferences>, DomainError> {
        let results = fund_preferences::Entity::find()
            .filter(fund_preferences::Column::FundId.eq(fund_id.0))
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find(
        &self,
        reviewer_id: &ReviewerId,
        fund_id: &FundId,
    ) -> Result<Option<FundPreferences>, DomainError> {
        let result = fund_preferences::Entity::find_by_id((reviewer_id.0, fund_id.0))
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }
}

/// Convert SeaORM model to domain entity
impl From<fund_preferences::Model> for FundPreferences {
    fn from(model: fund_preferences::Model) -> Self {
        FundPreferences {
            reviewer_id: ReviewerId(model.reviewer_id),
            fund_id: FundId(model.fund_id),
            // Unknown scopes fall back to the narrowest one (nothing selected)
            scope: model.scope.parse().unwrap_or(ReviewScope::Category),
            max_reviews: model.max_reviews.map(counter),
            selected_categories: from_json(model.selected_categories),
            excluded_proposals: from_json(model.excluded_proposals),
        }
    }
}
