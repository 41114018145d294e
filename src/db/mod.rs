pub mod periods;
pub mod pfa;
pub mod plannings;
pub mod skills;
pub mod subjects;
pub mod users;
pub mod years;

use chrono::Utc;
use uuid::Uuid;

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn now() -> String {
    Utc::now().to_rfc3339()
}
