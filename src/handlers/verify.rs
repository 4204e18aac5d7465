use axum::{Json, extract::State};

use crate::service::verification::CheckOutcome;
use crate::types::dto::{MessageResponse, VerifyCheckRequest, VerifyCheckResponse, VerifySendRequest};
use crate::types::phone::normalize_e164;
use crate::{BookingError, router::BookingState};

/// POST /verify/send -> text a one-time code to the given number.
pub async fn send_code(
    State(state): State<BookingState>,
    Json(req): Json<VerifySendRequest>,
) -> Result<Json<MessageResponse>, BookingError> {
    let phone = normalize_e164(&req.phone, &state.config.sms.default_country_code)?;
    state.verification.send_code(&phone).await?;
    Ok(Json(MessageResponse::new(format!(
        "Verification code sent to {phone}."
    ))))
}

/// POST /verify/check -> confirm a previously sent code.
pub async fn check_code(
    State(state): State<BookingState>,
    Json(req): Json<VerifyCheckRequest>,
) -> Result<Json<VerifyCheckResponse>, BookingError> {
    let phone = normalize_e164(&req.phone, &state.config.sms.default_country_code)?;
    match state.verification.check_code(&phone, &req.code).await? {
        CheckOutcome::Verified => Ok(Json(VerifyCheckResponse {
            verified: true,
            phone,
        })),
        CheckOutcome::WrongCode => Err(BookingError::InvalidInput(
            "Incorrect verification code.".to_string(),
        )),
        CheckOutcome::NoActiveCode => Err(BookingError::InvalidInput(
            "No active verification code; request a new one.".to_string(),
        )),
    }
}
