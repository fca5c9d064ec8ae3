use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::entities::project;

static LAST_ISSUED_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Next identifier for a project or one of its nested entries.
///
/// Identifiers are the wall-clock time in milliseconds, rendered as a decimal
/// string. Within one process the value is bumped past the last issued one, so
/// two entries created in the same millisecond still get distinct ids. Separate
/// processes can still collide.
pub fn next_entity_id() -> String {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_ISSUED_MILLIS.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_ISSUED_MILLIS.compare_exchange_weak(
            last,
            candidate,
            Ordering::AcqRel,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate.to_string(),
            Err(actual) => last = actual,
        }
    }
}

pub async fn project_row_id<C: ConnectionTrait>(
    db: &C,
    doc_id: &str,
    owner_id: Uuid,
) -> Result<Option<i64>, DbErr> {
    project::Entity::find()
        .select_only()
        .column(project::Column::Id)
        .filter(project::Column::DocId.eq(doc_id))
        .filter(project::Column::OwnerId.eq(owner_id))
        .into_tuple()
        .one(db)
        .await
}
