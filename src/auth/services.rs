use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::otp::{self, VerifyOutcome};
use crate::auth::password;
use crate::auth::repo::{self, User};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    Unauthorized,
    #[error("account already exists")]
    Conflict,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug)]
pub enum SignupOutcome {
    OtpSent { user_id: Uuid },
    EmailExistsVerified,
}

#[derive(Debug)]
pub enum VerifyOtpOutcome {
    UserCreated { token: String },
    OtpExpired,
    InvalidOtp,
}

#[derive(Debug)]
pub struct LoginSession {
    pub token: String,
    pub user: User,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// At least 8 characters, at least one ASCII letter and one digit.
pub(crate) fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// First step of onboarding. A verified email short-circuits before any code
/// is issued or row written; otherwise the pending signup is (re)issued and
/// the code emailed. Expects a normalized email and pre-validated input.
pub async fn signup(
    state: &AppState,
    email: &str,
    name: &str,
    password_plain: &str,
) -> Result<SignupOutcome, AuthError> {
    if User::find_by_email(&state.db, email).await?.is_some() {
        info!("signup for already verified email rejected");
        return Ok(SignupOutcome::EmailExistsVerified);
    }

    let password_hash = password::hash(password_plain)?;
    let ttl = Duration::minutes(state.config.otp.ttl_minutes);
    let issued = otp::issue(&state.db, email, name, &password_hash, ttl).await?;

    // Fire and forget: a slow or failing SMTP server must not block the
    // response or undo the pending row. Failures are logged; the user can
    // re-submit the form for a fresh code.
    let mailer = state.mailer.clone();
    let to = email.to_string();
    let code = issued.otp_code.clone();
    tokio::spawn(async move {
        if let Err(e) = mailer.send_otp(&to, &code).await {
            error!(error = %e, "otp email send failed");
        }
    });

    info!(user_id = %issued.user_id, "signup pending, otp issued");
    Ok(SignupOutcome::OtpSent {
        user_id: issued.user_id,
    })
}

/// Second step: code check, then materialization. Only a matching in-window
/// code creates the account; the duplicate-email race at insert surfaces as
/// `Conflict`.
pub async fn verify_otp(
    state: &AppState,
    user_id: Uuid,
    submitted: &str,
) -> Result<VerifyOtpOutcome, AuthError> {
    let ttl = Duration::minutes(state.config.otp.ttl_minutes);
    let pending = match otp::verify(&state.db, user_id, submitted, ttl).await? {
        VerifyOutcome::Invalid => {
            warn!(user_id = %user_id, "otp rejected");
            return Ok(VerifyOtpOutcome::InvalidOtp);
        }
        VerifyOutcome::Expired => {
            warn!(user_id = %user_id, "otp expired, code rotated");
            return Ok(VerifyOtpOutcome::OtpExpired);
        }
        VerifyOutcome::Valid(p) => p,
    };

    let user = match User::create(
        &state.db,
        &pending.email,
        &pending.name,
        &pending.password_hash,
    )
    .await
    {
        Ok(u) => u,
        Err(e) if repo::is_unique_violation(&e) => {
            warn!(user_id = %user_id, "materialization raced an existing account");
            return Err(AuthError::Conflict);
        }
        Err(e) => return Err(AuthError::Internal(e.into())),
    };

    // The pending row is now spent. Losing this delete only leaves a row for
    // the sweeper, so it never fails the flow.
    if let Err(e) = otp::delete(&state.db, pending.user_id).await {
        warn!(error = %e, user_id = %pending.user_id, "pending signup cleanup failed");
    }

    let token = state.jwt.sign(user.id)?;
    info!(user_id = %user.id, "user created, session issued");
    Ok(VerifyOtpOutcome::UserCreated { token })
}

/// Unknown email and wrong password fail identically so the endpoint cannot
/// be used to enumerate which addresses have accounts.
pub async fn login(
    state: &AppState,
    email: &str,
    password_plain: &str,
) -> Result<LoginSession, AuthError> {
    let Some(user) = User::find_by_email(&state.db, email).await? else {
        warn!("login with unknown email");
        return Err(AuthError::Unauthorized);
    };

    if !password::verify(password_plain, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(AuthError::Unauthorized);
    }

    let token = state.jwt.sign(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(LoginSession { token, user })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last+tag@sub.domain.co"));
        assert!(is_valid_email("u_1%x-y@host-name.org"));
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("plainaddress"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@host"));
        assert!(!is_valid_email("user@host.c"));
        assert!(!is_valid_email("user name@example.com"));
    }

    #[test]
    fn accepts_passwords_with_letter_and_digit() {
        assert!(is_valid_password("abcd1234"));
        assert!(is_valid_password("longer-passw0rd"));
    }

    #[test]
    fn rejects_short_passwords() {
        assert!(!is_valid_password("a1b2c3"));
    }

    #[test]
    fn rejects_passwords_missing_a_class() {
        assert!(!is_valid_password("abcdefgh"));
        assert!(!is_valid_password("12345678"));
    }
}
