//! PostgreSQL adapter for ProposalRepository

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Statement,
};

use super::{counter, from_json};
use crate::domain::entities::{ChallengeCategory, FundId, Proposal, ProposalId};
use crate::domain::ports::ProposalRepository;
use crate::entity::proposals;
use crate::error::DomainError;

/// PostgreSQL implementation of ProposalRepository
pub struct PostgresProposalRepository {
    db: DatabaseConnection,
}

impl PostgresProposalRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProposalRepository for PostgresProposalRepository {
    async fn find_by_id(&self, id: &ProposalId) -> Result<Option<Proposal>, DomainError> {
        let result = proposals::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_open_by_fund(&self, fund_id: &FundId) -> Result<Vec<Proposal>, DomainError> {
        let results = proposals::Entity::find()
            .filter(proposals::Column::FundId.eq(fund_id.0))
            .filter(
                Expr::col(proposals::Column::CurrentReviews)
                    .lt(Expr::col(proposals::Column::MinRequiredReviews)),
            )
            .order_by_asc(proposals::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_by_fund(&self, fund_id: &FundId) -> Result<Vec<Proposal>, DomainError> {
        let results = proposals::Entity::find()
            .filter(proposals::Column::FundId.eq(fund_id.0))
            .order_by_asc(proposals::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn try_increment_reviews(&self, id: &ProposalId) -> Result<bool, DomainError> {
        // Use raw SQL for atomic check-and-increment
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "UPDATE proposals SET current_reviews = current_reviews + 1 \
             WHERE id = $1 AND current_reviews < min_required_reviews",
            [id.0.into()],
        );

        let result = self
            .db
            .execute(stmt)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_review(&self, id: &ProposalId) -> Result<(), DomainError> {
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "UPDATE proposals SET current_reviews = current_reviews - 1 \
             WHERE id = $1 AND current_reviews > 0",
            [id.0.into()],
        );

        self.db
            .execute(stmt)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(())
    }
}

/// Convert SeaORM model to domain entity
impl From<proposals::Model> for Proposal {
    fn from(model: proposals::Model) -> Self {
        Proposal {
            id: ProposalId(model.id),
            fund_id: FundId(model.fund_id),
            title: model.title,
            category: model.category.parse().unwrap_or(ChallengeCategory::Concept),
            primary_tag: model.primary_tag,
            detailed_tags: from_json(model.detailed_tags),
            current_reviews: counter(model.current_reviews),
            min_required_reviews: counter(model.min_required_reviews),
            requested_funding: model.requested_funding,
        }
    }
}
