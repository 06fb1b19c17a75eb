//! Employee repository. Every function runs against whatever connection it is
//! handed, so callers decide whether it participates in a session.

use entity::{Employee, MutableField, employee};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, Set};
use tracing::debug;
use uuid::Uuid;

use crate::DbResult;

pub async fn insert<C>(conn: &C, name: String, department: String) -> DbResult<employee::Model>
where
    C: ConnectionTrait,
{
    let model = employee::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        department: Set(department),
    };
    let created = model.insert(conn).await?;
    debug!(employee_id = %created.id, "employee row inserted");
    Ok(created)
}

/// All rows in store order.
pub async fn list<C: ConnectionTrait>(conn: &C) -> DbResult<Vec<employee::Model>> {
    Ok(Employee::find().all(conn).await?)
}

pub async fn find<C: ConnectionTrait>(conn: &C, id: Uuid) -> DbResult<Option<employee::Model>> {
    Ok(Employee::find_by_id(id).one(conn).await?)
}

/// Overwrite one mutable column. `None` when no row has this id.
pub async fn update_field<C>(
    conn: &C,
    id: Uuid,
    field: MutableField,
    value: String,
) -> DbResult<Option<employee::Model>>
where
    C: ConnectionTrait,
{
    let Some(existing) = Employee::find_by_id(id).one(conn).await? else {
        return Ok(None);
    };
    let mut active: employee::ActiveModel = existing.into();
    field.assign(&mut active, value);
    match active.update(conn).await {
        Ok(updated) => {
            debug!(employee_id = %id, %field, "employee row updated");
            Ok(Some(updated))
        }
        // The row vanished between the read and the write.
        Err(DbErr::RecordNotUpdated) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Hard delete. Returns whether a row was removed.
pub async fn delete<C: ConnectionTrait>(conn: &C, id: Uuid) -> DbResult<bool> {
    let result = Employee::delete_by_id(id).exec(conn).await?;
    Ok(result.rows_affected > 0)
}
