//! PostgreSQL adapter for ReviewRepository

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::domain::entities::{ProposalId, Review, ReviewId, ReviewStatus, ReviewerId};
use crate::domain::ports::ReviewRepository;
use crate::entity::reviews;
use crate::error::DomainError;

/// PostgreSQL implementation of ReviewRepository
pub struct PostgresReviewRepository {
    db: DatabaseConnection,
}

impl PostgresReviewRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReviewRepository for PostgresReviewRepository {
    async fn find_by_id(&self, id: &ReviewId) -> Result<Option<Review>, DomainError> {
        let result = reviews::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_by_proposal(&self, proposal_id: &ProposalId) -> Result<Vec<Review>, DomainError> {
        let results = reviews::Entity::find()
            .filter(reviews::Column::ProposalId.eq(proposal_id.0))
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_submitted_by_proposals(
        &self,
        proposal_ids: &[ProposalId],
    ) -> Result<Vec<Review>, DomainError> {
        if proposal_ids.is_empty() {
            return Ok(Vec::new());
        }

        let results = reviews::Entity::find()
            .filter(reviews::Column::ProposalId.is_in(proposal_ids.iter().map(|id| id.0)))
            .filter(reviews::Column::Status.eq(ReviewStatus::Submitted.to_string()))
            .order_by_asc(reviews::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }
}

/// Convert SeaORM model to domain entity
impl From<reviews::Model> for Review {
    fn from(model: reviews::Model) -> Self {
        Review {
            id: ReviewId(model.id),
            proposal_id: ProposalId(model.proposal_id),
            reviewer_id: ReviewerId(model.reviewer_id),
            status: model.status.parse().unwrap_or(ReviewStatus::Assigned),
            rating: model.rating,
        }
    }
}
