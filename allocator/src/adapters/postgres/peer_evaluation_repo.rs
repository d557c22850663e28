//! PostgreSQL adapter for PeerEvaluationRepository

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set};
use uuid::Uuid;

use super::{from_json, write_error};
use crate::domain::entities::{
    PeerEvaluation, PeerEvaluationId, PeerEvaluationStatus, ReviewId, ReviewerId,
};
use crate::domain::ports::PeerEvaluationRepository;
use crate::entity::peer_evaluations;
use crate::error::DomainError;

/// PostgreSQL implementation of PeerEvaluationRepository
pub struct PostgresPeerEvaluationRepository {
    db: DatabaseConnection,
}

impl PostgresPeerEvaluationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PeerEvaluationRepository for PostgresPeerEvaluationRepository {
    async fn create_many(&self, evaluations: &[PeerEvaluation]) -> Result<(), DomainError> {
        if evaluations.is_empty() {
            return Ok(());
        }

        let mut models = Vec::with_capacity(evaluations.len());
        for e in evaluations {
            let scores = serde_json::to_value(&e.scores)
                .map_err(|err| DomainError::Internal(err.to_string()))?;
            models.push(peer_evaluations::ActiveModel {
                id: Set(e.id.0),
                review_id: Set(e.review_id.0),
                evaluator_id: Set(e.evaluator_id.0),
                scores: Set(scores),
                status: Set(e.status.to_string()),
                created_at: Set(e.created_at.fixed_offset()),
                due_date: Set(e.due_date.fixed_offset()),
            });
        }

        peer_evaluations::Entity::insert_many(models)
            .exec(&self.db)
            .await
            .map_err(write_error)?;

        Ok(())
    }

    async fn find_by_review(
        &self,
        review_id: &ReviewId,
    ) -> Result<Vec<PeerEvaluation>, DomainError> {
        let results = peer_evaluations::Entity::find()
            .filter(peer_evaluations::Column::ReviewId.eq(review_id.0))
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_existing_ids(
        &self,
        ids: &[PeerEvaluationId],
    ) -> Result<HashSet<PeerEvaluationId>, DomainError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let found: Vec<Uuid> = peer_evaluations::Entity::find()
            .select_only()
            .column(peer_evaluations::Column::Id)
            .filter(peer_evaluations::Column::Id.is_in(ids.iter().map(|id| id.0)))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(found.into_iter().map(PeerEvaluationId).collect())
    }
}

/// Convert SeaORM model to domain entity
impl From<peer_evaluations::Model> for PeerEvaluation {
    fn from(model: peer_evaluations::Model) -> Self {
        PeerEvaluation {
            id: PeerEvaluationId(model.id),
            review_id: ReviewId(model.review_id),
            evaluator_id: ReviewerId(model.evaluator_id),
            scores: from_json(model.scores),
            status: model
                .status
                .parse()
                .unwrap_or(PeerEvaluationStatus::Pending),
            created_at: model.created_at.with_timezone(&Utc),
            due_date: model.due_date.with_timezone(&Utc),
        }
    }
}
