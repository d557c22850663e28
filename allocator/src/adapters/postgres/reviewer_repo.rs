//! PostgreSQL adapter for ReviewerRepository

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect, Statement,
};
use uuid::Uuid;

use super::{counter, from_json};
use crate::domain::entities::{
    ExpertiseArea, ExpertiseScores, FundId, ReviewerId, ReviewerProfile,
};
use crate::domain::ports::ReviewerRepository;
use crate::entity::{fund_preferences, reviewers};
use crate::error::DomainError;

/// PostgreSQL implementation of ReviewerRepository
pub struct PostgresReviewerRepository {
    db: DatabaseConnection,
}

impl PostgresReviewerRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Run a conditional counter update, reporting whether a row changed
    async fn conditional_update(
        &self,
        sql: &str,
        values: Vec<sea_orm::Value>,
    ) -> Result<bool, DomainError> {
        let stmt = Statement::from_sql_and_values(DatabaseBackend::Postgres, sql, values);
        let result = self
            .db
            .execute(stmt)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl ReviewerRepository for PostgresReviewerRepository {
    async fn find_by_id(&self, id: &ReviewerId) -> Result<Option<ReviewerProfile>, DomainError> {
        let result = reviewers::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_active_by_fund(
        &self,
        fund_id: &FundId,
    ) -> Result<Vec<ReviewerProfile>, DomainError> {
        // Fund membership is having a preference record for the fund
        let reviewer_ids: Vec<Uuid> = fund_preferences::Entity::find()
            .select_only()
            .column(fund_preferences::Column::ReviewerId)
            .filter(fund_preferences::Column::FundId.eq(fund_id.0))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        if reviewer_ids.is_empty() {
            return Ok(Vec::new());
        }

        let results = reviewers::Entity::find()
            .filter(reviewers::Column::Id.is_in(reviewer_ids))
            .filter(reviewers::Column::IsActive.eq(true))
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn try_increment_active_reviews(&self, id: &ReviewerId) -> Result<bool, DomainError> {
        self.conditional_update(
            "UPDATE reviewers SET active_reviews = active_reviews + 1 \
             WHERE id = $1 AND active_reviews < max_capacity",
            vec![id.0.into()],
        )
        .await
    }

    async fn release_active_review(&self, id: &ReviewerId) -> Result<(), DomainError> {
        self.conditional_update(
            "UPDATE reviewers SET active_reviews = active_reviews - 1 \
             WHERE id = $1 AND active_reviews > 0",
            vec![id.0.into()],
        )
        .await?;

        Ok(())
    }

    async fn try_increment_peer_reviews(
        &self,
        id: &ReviewerId,
        max_peer_capacity: u32,
    ) -> Result<bool, DomainError> {
        let cap = i32::try_from(max_peer_capacity).unwrap_or(i32::MAX);
        self.conditional_update(
            "UPDATE reviewers SET active_peer_reviews = active_peer_reviews + 1 \
             WHERE id = $1 AND active_peer_reviews < $2",
            vec![id.0.into(), cap.into()],
        )
        .await
    }

    async fn release_peer_review(&self, id: &ReviewerId) -> Result<(), DomainError> {
        self.conditional_update(
            "UPDATE reviewers SET active_peer_reviews = active_peer_reviews - 1 \
             WHERE id = $1 AND active_peer_reviews > 0",
            vec![id.0.into()],
        )
        .await?;

        Ok(())
    }
}

/// Convert SeaORM model to domain entity
impl From<reviewers::Model> for ReviewerProfile {
    fn from(model: reviewers::Model) -> Self {
        let level = |value: Option<i16>| value.map(|l| l.clamp(0, 5) as u8);

        ReviewerProfile {
            id: ReviewerId(model.id),
            name: model.name,
            primary_expertise: model
                .primary_expertise
                .parse()
                .unwrap_or(ExpertiseArea::Technical),
            expertise: ExpertiseScores {
                technical: level(model.technical_level),
                product: level(model.product_level),
                community: level(model.community_level),
            },
            interests: from_json(model.interests),
            affiliated_proposals: from_json(model.affiliated_proposals),
            active_reviews: counter(model.active_reviews),
            max_capacity: counter(model.max_capacity),
            active_peer_reviews: counter(model.active_peer_reviews),
            is_active: model.is_active,
        }
    }
}
