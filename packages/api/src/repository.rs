//! Student record store
//!
//! Thin persistence layer over the `students` table. Records are addressed by
//! their external `student_id`, not by the surrogate primary key.

use crate::entity::student;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Schema, Set,
};
use serde::{Deserialize, Serialize};

/// Client-supplied fields for create and update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStudent {
    pub name: String,
    pub student_id: i32,
}

#[derive(Debug, Clone)]
pub enum WriteOutcome {
    Written(student::Model),
    NotFound,
    /// Another record already owns the requested `student_id`
    Duplicate(i32),
}

#[derive(Clone, Debug)]
pub struct StudentRepository {
    db: DatabaseConnection,
}

impl StudentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create the `students` table when it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), DbErr> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);
        let mut table = schema.create_table_from_entity(student::Entity);
        table.if_not_exists();
        self.db.execute(backend.build(&table)).await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<student::Model>, DbErr> {
        student::Entity::find()
            .order_by_asc(student::Column::Id)
            .all(&self.db)
            .await
    }

    pub async fn find(&self, student_id: i32) -> Result<Option<student::Model>, DbErr> {
        student::Entity::find()
            .filter(student::Column::StudentId.eq(student_id))
            .one(&self.db)
            .await
    }

    pub async fn create(&self, new: NewStudent) -> Result<WriteOutcome, DbErr> {
        if self.find(new.student_id).await?.is_some() {
            return Ok(WriteOutcome::Duplicate(new.student_id));
        }
        let active = student::ActiveModel {
            name: Set(new.name),
            student_id: Set(new.student_id),
            ..Default::default()
        };
        let model = active.insert(&self.db).await?;
        Ok(WriteOutcome::Written(model))
    }

    pub async fn update(&self, student_id: i32, new: NewStudent) -> Result<WriteOutcome, DbErr> {
        let Some(existing) = self.find(student_id).await? else {
            return Ok(WriteOutcome::NotFound);
        };
        if new.student_id != student_id && self.find(new.student_id).await?.is_some() {
            return Ok(WriteOutcome::Duplicate(new.student_id));
        }

        let mut active = existing.into_active_model();
        active.name = Set(new.name);
        active.student_id = Set(new.student_id);
        let model = active.update(&self.db).await?;
        Ok(WriteOutcome::Written(model))
    }

    /// Returns whether a record was removed.
    pub async fn delete(&self, student_id: i32) -> Result<bool, DbErr> {
        let result = student::Entity::delete_many()
            .filter(student::Column::StudentId.eq(student_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
