use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for starting a signup.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Request body for submitting the emailed code.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub user_id: Uuid,
    pub otp: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Machine-readable result codes for signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignupCode {
    OtpSent,
    EmailExistsVerified,
    InternalServerError,
}

/// Machine-readable result codes for OTP verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerifyOtpCode {
    UserCreated,
    OtpExpired,
    InvalidOtp,
    InternalServerError,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub success: bool,
    pub code: SignupCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub code: VerifyOtpCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn signup_codes_serialize_screaming_snake() {
        assert_eq!(serde_json::to_value(SignupCode::OtpSent).unwrap(), json!("OTP_SENT"));
        assert_eq!(
            serde_json::to_value(SignupCode::EmailExistsVerified).unwrap(),
            json!("EMAIL_EXISTS_VERIFIED")
        );
        assert_eq!(
            serde_json::to_value(SignupCode::InternalServerError).unwrap(),
            json!("INTERNAL_SERVER_ERROR")
        );
    }

    #[test]
    fn verify_otp_codes_serialize_screaming_snake() {
        assert_eq!(
            serde_json::to_value(VerifyOtpCode::UserCreated).unwrap(),
            json!("USER_CREATED")
        );
        assert_eq!(
            serde_json::to_value(VerifyOtpCode::OtpExpired).unwrap(),
            json!("OTP_EXPIRED")
        );
        assert_eq!(
            serde_json::to_value(VerifyOtpCode::InvalidOtp).unwrap(),
            json!("INVALID_OTP")
        );
    }

    #[test]
    fn signup_response_omits_absent_user_id() {
        let resp = SignupResponse {
            success: false,
            code: SignupCode::EmailExistsVerified,
            user_id: None,
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            value,
            json!({"success": false, "code": "EMAIL_EXISTS_VERIFIED"})
        );
    }

    #[test]
    fn signup_response_carries_user_id_when_sent() {
        let user_id = Uuid::new_v4();
        let resp = SignupResponse {
            success: true,
            code: SignupCode::OtpSent,
            user_id: Some(user_id),
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["code"], json!("OTP_SENT"));
        assert_eq!(value["user_id"], json!(user_id.to_string()));
    }

    #[test]
    fn verify_otp_response_omits_absent_token() {
        let resp = VerifyOtpResponse {
            success: false,
            code: VerifyOtpCode::InvalidOtp,
            token: None,
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value, json!({"success": false, "code": "INVALID_OTP"}));
    }
}
