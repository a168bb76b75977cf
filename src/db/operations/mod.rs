pub mod progress;
pub mod topics;

pub use progress::PgProgressRepository;
pub use topics::PgTopicCatalog;

use chrono::{DateTime, NaiveDateTime, Utc};

pub(crate) fn to_utc(value: NaiveDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(value, Utc)
}
