use rand::{rngs::OsRng, Rng};
use sqlx::{FromRow, PgPool};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

/// A signup waiting on email verification. `user_id` is allocated on the first
/// attempt for an email and survives re-issues; the row itself is consumed
/// when the account materializes.
#[derive(Debug, Clone, FromRow)]
pub struct PendingSignup {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub otp_code: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct IssuedOtp {
    pub user_id: Uuid,
    pub otp_code: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug)]
pub enum VerifyOutcome {
    Valid(PendingSignup),
    Expired,
    Invalid,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CodeCheck {
    Match,
    Mismatch,
    MatchButExpired,
}

/// Six decimal digits from the OS entropy source.
pub fn generate_code() -> String {
    OsRng.gen_range(100_000..=999_999).to_string()
}

/// Mismatch is decided before expiry: a wrong code is rejected as invalid even
/// when the stored one has already lapsed.
pub fn check_code(pending: &PendingSignup, submitted: &str, now: OffsetDateTime) -> CodeCheck {
    if pending.otp_code != submitted {
        return CodeCheck::Mismatch;
    }
    if now > pending.expires_at {
        return CodeCheck::MatchButExpired;
    }
    CodeCheck::Match
}

/// Upserts the pending signup for `email` with a fresh code and expiry. A
/// repeat attempt for the same email overwrites everything except `user_id`,
/// so at most one code is live per address.
pub async fn issue(
    db: &PgPool,
    email: &str,
    name: &str,
    password_hash: &str,
    ttl: Duration,
) -> anyhow::Result<IssuedOtp> {
    let otp_code = generate_code();
    let expires_at = OffsetDateTime::now_utc() + ttl;
    let row = sqlx::query_as::<_, PendingSignup>(
        r#"
        INSERT INTO pending_signups (email, name, password_hash, otp_code, expires_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE
        SET name = EXCLUDED.name,
            password_hash = EXCLUDED.password_hash,
            otp_code = EXCLUDED.otp_code,
            created_at = NOW(),
            expires_at = EXCLUDED.expires_at
        RETURNING user_id, email, name, password_hash, otp_code, created_at, expires_at
    "#,
    )
    .bind(email)
    .bind(name)
    .bind(password_hash)
    .bind(&otp_code)
    .bind(expires_at)
    .fetch_one(db)
    .await?;
    debug!(user_id = %row.user_id, "otp issued");
    Ok(IssuedOtp {
        user_id: row.user_id,
        otp_code: row.otp_code,
        expires_at: row.expires_at,
    })
}

pub async fn find_by_user_id(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<PendingSignup>> {
    let row = sqlx::query_as::<_, PendingSignup>(
        r#"
        SELECT user_id, email, name, password_hash, otp_code, created_at, expires_at
        FROM pending_signups
        WHERE user_id = $1
    "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Stamps a fresh code and expiry onto an existing pending row in one UPDATE.
/// The previous code stops working the moment this commits.
pub async fn rotate_code(db: &PgPool, user_id: Uuid, ttl: Duration) -> anyhow::Result<IssuedOtp> {
    let otp_code = generate_code();
    let expires_at = OffsetDateTime::now_utc() + ttl;
    let row = sqlx::query_as::<_, PendingSignup>(
        r#"
        UPDATE pending_signups
        SET otp_code = $2, expires_at = $3
        WHERE user_id = $1
        RETURNING user_id, email, name, password_hash, otp_code, created_at, expires_at
    "#,
    )
    .bind(user_id)
    .bind(&otp_code)
    .bind(expires_at)
    .fetch_one(db)
    .await?;
    debug!(user_id = %row.user_id, "otp rotated");
    Ok(IssuedOtp {
        user_id: row.user_id,
        otp_code: row.otp_code,
        expires_at: row.expires_at,
    })
}

/// Decides a verification attempt. On a matching-but-stale code the row is
/// rotated before `Expired` is returned, so retrying with the old code fails.
/// A matching in-window code returns the row untouched; deleting it belongs
/// to the materialization step.
pub async fn verify(
    db: &PgPool,
    user_id: Uuid,
    submitted: &str,
    ttl: Duration,
) -> anyhow::Result<VerifyOutcome> {
    let Some(pending) = find_by_user_id(db, user_id).await? else {
        return Ok(VerifyOutcome::Invalid);
    };
    match check_code(&pending, submitted, OffsetDateTime::now_utc()) {
        CodeCheck::Mismatch => Ok(VerifyOutcome::Invalid),
        CodeCheck::MatchButExpired => {
            rotate_code(db, user_id, ttl).await?;
            Ok(VerifyOutcome::Expired)
        }
        CodeCheck::Match => Ok(VerifyOutcome::Valid(pending)),
    }
}

pub async fn delete(db: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM pending_signups WHERE user_id = $1")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(code: &str, expires_at: OffsetDateTime) -> PendingSignup {
        PendingSignup {
            user_id: Uuid::new_v4(),
            email: "buyer@example.com".into(),
            name: "Buyer".into(),
            password_hash: "$argon2id$stub".into(),
            otp_code: code.into(),
            created_at: expires_at - Duration::minutes(5),
            expires_at,
        }
    }

    #[test]
    fn matching_code_in_window_is_match() {
        let now = OffsetDateTime::now_utc();
        let row = pending("123456", now + Duration::minutes(5));
        assert_eq!(check_code(&row, "123456", now), CodeCheck::Match);
    }

    #[test]
    fn matching_code_at_exact_expiry_is_still_match() {
        let now = OffsetDateTime::now_utc();
        let row = pending("123456", now);
        assert_eq!(check_code(&row, "123456", now), CodeCheck::Match);
    }

    #[test]
    fn matching_code_past_expiry_is_expired() {
        let now = OffsetDateTime::now_utc();
        let row = pending("123456", now - Duration::seconds(1));
        assert_eq!(check_code(&row, "123456", now), CodeCheck::MatchButExpired);
    }

    #[test]
    fn wrong_code_is_mismatch_even_when_expired() {
        let now = OffsetDateTime::now_utc();
        let row = pending("123456", now - Duration::minutes(10));
        assert_eq!(check_code(&row, "654321", now), CodeCheck::Mismatch);
    }

    #[test]
    fn wrong_code_in_window_is_mismatch() {
        let now = OffsetDateTime::now_utc();
        let row = pending("123456", now + Duration::minutes(5));
        assert_eq!(check_code(&row, "123455", now), CodeCheck::Mismatch);
    }

    #[test]
    fn generated_code_is_six_digits_in_range() {
        for _ in 0..64 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().expect("numeric");
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn generated_codes_vary() {
        let first = generate_code();
        let varied = (0..16).map(|_| generate_code()).any(|c| c != first);
        assert!(varied);
    }
}
