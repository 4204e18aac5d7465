use axum::{
    Json,
    extract::State,
    response::Html,
};
use tracing::{info, warn};

use crate::db::NewBooking;
use crate::service::sms_dispatcher::SmsOutcome;
use crate::types::dto::{BookingRequest, BookingResponse, FirebaseWebConfig};
use crate::types::phone::normalize_e164;
use crate::{BookingError, router::BookingState};

const BOOKING_PAGE: &str = include_str!("../../assets/booking.html");
const MAX_FIELD_LEN: usize = 200;

/// GET / -> booking form, with the Firebase web config inlined (or `null`).
pub async fn booking_page(State(state): State<BookingState>) -> Result<Html<String>, BookingError> {
    let firebase = &state.config.firebase;
    let inline = if firebase.is_configured() {
        // `<` escaped so no value can close the surrounding <script>
        serde_json::to_string(&FirebaseWebConfig::from(firebase))?.replace('<', "\\u003c")
    } else {
        "null".to_string()
    };
    Ok(Html(BOOKING_PAGE.replace("__FIREBASE_CONFIG__", &inline)))
}

/// POST /book -> store the booking and text a confirmation when a phone is given.
pub async fn create_booking(
    State(state): State<BookingState>,
    Json(req): Json<BookingRequest>,
) -> Result<Json<BookingResponse>, BookingError> {
    let name = req.name.trim().to_string();
    let time = req.time.trim().to_string();
    if name.is_empty() || time.is_empty() {
        return Err(BookingError::InvalidInput(
            "Both name and time are required.".to_string(),
        ));
    }
    if name.chars().count() > MAX_FIELD_LEN || time.chars().count() > MAX_FIELD_LEN {
        return Err(BookingError::InvalidInput(
            "Name or time is too long.".to_string(),
        ));
    }

    let phone = match req.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(raw) => Some(normalize_e164(raw, &state.config.sms.default_country_code)?),
        None => None,
    };

    let booking = state
        .storage
        .insert_booking(NewBooking { name, time, phone })
        .await?;
    info!(booking_id = booking.id, "booking stored");

    let sms = match booking.phone.as_deref() {
        None => "skipped",
        Some(to) => {
            let text = format!("Booking confirmed for {} at {}.", booking.name, booking.time);
            match state.sms.send(to, &text).await {
                Ok(SmsOutcome::Sent(_)) => "sent",
                Ok(SmsOutcome::Skipped) => "skipped",
                Err(e) => {
                    warn!(booking_id = booking.id, error = %e, "booking confirmation SMS failed");
                    "failed"
                }
            }
        }
    };

    Ok(Json(BookingResponse {
        message: format!("Booking confirmed for {} at {}!", booking.name, booking.time),
        id: booking.id,
        sms,
    }))
}
