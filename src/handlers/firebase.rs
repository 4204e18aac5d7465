use axum::{Json, extract::State};

use crate::types::dto::FirebaseWebConfig;
use crate::{BookingError, router::BookingState};

/// GET /firebase-config.json -> public identifiers for the Google sign-in popup.
pub async fn firebase_config(
    State(state): State<BookingState>,
) -> Result<Json<FirebaseWebConfig>, BookingError> {
    let firebase = &state.config.firebase;
    if !firebase.is_configured() {
        return Err(BookingError::NotFound);
    }
    Ok(Json(FirebaseWebConfig::from(firebase)))
}
