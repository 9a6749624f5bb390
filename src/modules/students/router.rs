use crate::modules::students::controller::get_my_status;
use crate::state::AppState;
use axum::{Router, routing::get};

pub fn init_students_router() -> Router<AppState> {
    Router::new().route("/me/status", get(get_my_status))
}
