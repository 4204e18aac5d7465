pub mod login_guard;
pub mod sms_dispatcher;
pub mod verification;
