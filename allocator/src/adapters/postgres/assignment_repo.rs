//! PostgreSQL adapter for AssignmentRepository

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set};
use uuid::Uuid;

use super::write_error;
use crate::domain::entities::{
    Assignment, AssignmentId, AssignmentStatus, FundId, MatchTier, ProposalId, ReviewerId,
};
use crate::domain::ports::AssignmentRepository;
use crate::entity::assignments;
use crate::error::DomainError;

/// PostgreSQL implementation of AssignmentRepository
pub struct PostgresAssignmentRepository {
    db: DatabaseConnection,
}

impl PostgresAssignmentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AssignmentRepository for PostgresAssignmentRepository {
    async fn create_many(&self, records: &[Assignment]) -> Result<(), DomainError> {
        if records.is_empty() {
            return Ok(());
        }

        // A single multi-row INSERT is all or nothing
        let models = records.iter().map(|a| assignments::ActiveModel {
            id: Set(a.id.0),
            reviewer_id: Set(a.reviewer_id.0),
            proposal_id: Set(a.proposal_id.0),
            fund_id: Set(a.fund_id.0),
            tier: Set(a.tier.to_string()),
            status: Set(a.status.to_string()),
            assigned_at: Set(a.assigned_at.fixed_offset()),
            due_date: Set(a.due_date.fixed_offset()),
        });

        assignments::Entity::insert_many(models)
            .exec(&self.db)
            .await
            .map_err(write_error)?;

        Ok(())
    }

    async fn find_proposal_ids_by_reviewer(
        &self,
        reviewer_id: &ReviewerId,
        fund_id: &FundId,
    ) -> Result<HashSet<ProposalId>, DomainError> {
        let ids: Vec<Uuid> = assignments::Entity::find()
            .select_only()
            .column(assignments::Column::ProposalId)
            .filter(assignments::Column::ReviewerId.eq(reviewer_id.0))
            .filter(assignments::Column::FundId.eq(fund_id.0))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(ids.into_iter().map(ProposalId).collect())
    }

    async fn find_by_proposal(
        &self,
        proposal_id: &ProposalId,
    ) -> Result<Vec<Assignment>, DomainError> {
        let results = assignments::Entity::find()
            .filter(assignments::Column::ProposalId.eq(proposal_id.0))
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_existing_ids(
        &self,
        ids: &[AssignmentId],
    ) -> Result<HashSet<AssignmentId>, DomainError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let found: Vec<Uuid> = assignments::Entity::find()
            .select_only()
            .column(assignments::Column::Id)
            .filter(assignments::Column::Id.is_in(ids.iter().map(|id| id.0)))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(found.into_iter().map(AssignmentId).collect())
    }
}

/// Convert SeaORM model to domain entity
impl From<assignments::Model> for Assignment {
    fn from(model: assignments::Model) -> Self {
        Assignment {
            id: AssignmentId(model.id),
            reviewer_id: ReviewerId(model.reviewer_id),
            proposal_id: ProposalId(model.proposal_id),
            fund_id: FundId(model.fund_id),
            tier: model.tier.parse().unwrap_or(MatchTier::Other),
            assigned_at: model.assigned_at.with_timezone(&Utc),
            due_date: model.due_date.with_timezone(&Utc),
            status: model.status.parse().unwrap_or(AssignmentStatus::Assigned),
        }
    }
}
