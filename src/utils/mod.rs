pub mod time;

use nanoid::nanoid;
use uuid::Uuid;

/// Generate a long unique id for sessions and other runtime entities.
pub fn longid() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Generate a short unique id for event and log records.
pub fn shortid() -> String {
    nanoid!(16)
}
