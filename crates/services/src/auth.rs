//! # Auth Service
//!
//! Account registration and credential login.
//! Hashing runs on the blocking pool; Argon2 is deliberately slow.

use std::sync::Arc;
use std::time::Duration;

use domains::{
    ActivityAction, AppError, CredentialHasher, NewUser, Result, StoreError, TokenIssuer, User,
    UserRepository, MAX_EMAIL_CHARS, MAX_USERNAME_CHARS,
};
use serde_json::json;
use tracing::{info, warn};

use crate::activity::ActivityRecorder;
use crate::utils::{bounded, required_text};

pub const MIN_PASSWORD_CHARS: usize = 8;

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

/// Well-formed Argon2id hash of no known password, verified against when the
/// email is unknown so both rejection paths cost one hash computation.
pub const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$aYy65iejohn8GJ7FfOo4oA$HH56SkJqKv6xC4kKbFpO6oiRfQlKd0m2Uddh2PqdZRA";

#[derive(Debug, Clone, Default)]
pub struct RegisterUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LoginUser {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoggedIn {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<dyn TokenIssuer>,
    activity: ActivityRecorder,
    store_timeout: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<dyn TokenIssuer>,
        activity: ActivityRecorder,
        store_timeout: Duration,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            activity,
            store_timeout,
        }
    }

    pub async fn register(&self, input: RegisterUser) -> Result<User> {
        let username = required_text(input.username, "username").map_err(AppError::Validation)?;
        let email = required_text(input.email, "email")
            .map_err(AppError::Validation)?
            .to_lowercase();
        let password = input
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::Validation("`password` is required".into()))?;

        if username.chars().count() > MAX_USERNAME_CHARS {
            return Err(AppError::Validation(format!(
                "`username` must be at most {MAX_USERNAME_CHARS} characters"
            )));
        }
        if email.chars().count() > MAX_EMAIL_CHARS {
            return Err(AppError::Validation(format!(
                "`email` must be at most {MAX_EMAIL_CHARS} characters"
            )));
        }
        if !looks_like_email(&email) {
            return Err(AppError::Validation("`email` is not a valid address".into()));
        }
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::Validation(format!(
                "`password` must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }

        let hasher = Arc::clone(&self.hasher);
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;

        let new_user = NewUser {
            username,
            email,
            password_hash,
        };
        let user = bounded(self.store_timeout, "insert_user", self.users.insert_user(new_user))
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(detail) => {
                    warn!(%detail, "registration rejected, duplicate account");
                    AppError::Conflict("Username or email already exists.".into())
                }
                other => AppError::Store(other),
            })?;

        info!(user_id = user.id, "user registered");
        self.activity.record(
            user.id,
            ActivityAction::UserRegistered,
            json!({ "username": user.username }),
        );
        Ok(user)
    }

    pub async fn login(&self, input: LoginUser) -> Result<LoggedIn> {
        let email = required_text(input.email, "email")
            .map_err(AppError::Validation)?
            .to_lowercase();
        let password = input
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::Validation("`password` is required".into()))?;

        let found = bounded(
            self.store_timeout,
            "find_user_by_email",
            self.users.find_user_by_email(&email),
        )
        .await?;

        let hasher = Arc::clone(&self.hasher);
        let stored_hash = found
            .as_ref()
            .map_or_else(|| DUMMY_PASSWORD_HASH.to_string(), |u| u.password_hash.clone());
        let verified =
            tokio::task::spawn_blocking(move || hasher.verify_password(&password, &stored_hash))
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?;

        let Some(user) = found else {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        };
        if !verified {
            warn!(user_id = user.id, "login rejected, wrong password");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        let token = self.tokens.issue(&user)?;
        info!(user_id = user.id, "login succeeded");
        self.activity
            .record(user.id, ActivityAction::LoginSucceeded, json!({ "email": user.email }));

        Ok(LoggedIn { token, user })
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{AuthError, MockCredentialHasher, MockTokenIssuer, MockUserRepository};

    fn alice() -> User {
        User {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "stored".into(),
            created_at: Utc::now(),
        }
    }

    fn service(
        users: MockUserRepository,
        hasher: MockCredentialHasher,
        tokens: MockTokenIssuer,
    ) -> AuthService {
        AuthService::new(
            Arc::new(users),
            Arc::new(hasher),
            Arc::new(tokens),
            ActivityRecorder::disabled(),
            Duration::from_secs(1),
        )
    }

    fn register_input() -> RegisterUser {
        RegisterUser {
            username: Some("alice".into()),
            email: Some("Alice@Example.com".into()),
            password: Some("correct horse".into()),
        }
    }

    #[tokio::test]
    async fn register_stores_hash_not_password() {
        let mut hasher = MockCredentialHasher::new();
        hasher.expect_hash_password().returning(|_| Ok("hashed".into()));
        let mut users = MockUserRepository::new();
        users.expect_insert_user()
            .withf(|u| u.password_hash == "hashed" && u.email == "alice@example.com")
            .times(1)
            .returning(|_| Ok(alice()));

        let user = tokio_test::assert_ok!(
            service(users, hasher, MockTokenIssuer::new()).register(register_input()).await
        );
        assert_eq!(user.id, 1);
    }

    #[tokio::test]
    async fn duplicate_account_is_a_conflict() {
        let mut hasher = MockCredentialHasher::new();
        hasher.expect_hash_password().returning(|_| Ok("hashed".into()));
        let mut users = MockUserRepository::new();
        users.expect_insert_user()
            .returning(|_| Err(StoreError::UniqueViolation("users_email_key".into())));

        let err = service(users, hasher, MockTokenIssuer::new())
            .register(register_input())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn short_password_is_rejected_before_hashing() {
        let mut hasher = MockCredentialHasher::new();
        hasher.expect_hash_password().never();
        let input = RegisterUser {
            password: Some("short".into()),
            ..register_input()
        };
        let err = service(MockUserRepository::new(), hasher, MockTokenIssuer::new())
            .register(input)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn over_long_identity_is_rejected_before_the_store() {
        let long_username = RegisterUser {
            username: Some("u".repeat(MAX_USERNAME_CHARS + 1)),
            ..register_input()
        };
        let long_email = RegisterUser {
            email: Some(format!("{}@example.com", "e".repeat(MAX_EMAIL_CHARS))),
            ..register_input()
        };

        for input in [long_username, long_email] {
            let mut hasher = MockCredentialHasher::new();
            hasher.expect_hash_password().never();
            let mut users = MockUserRepository::new();
            users.expect_insert_user().never();

            let err = service(users, hasher, MockTokenIssuer::new())
                .register(input)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn username_at_the_limit_is_accepted() {
        let mut hasher = MockCredentialHasher::new();
        hasher.expect_hash_password().returning(|_| Ok("hashed".into()));
        let mut users = MockUserRepository::new();
        users.expect_insert_user().times(1).returning(|_| Ok(alice()));

        let input = RegisterUser {
            username: Some("u".repeat(MAX_USERNAME_CHARS)),
            ..register_input()
        };
        tokio_test::assert_ok!(
            service(users, hasher, MockTokenIssuer::new()).register(input).await
        );
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let mut users = MockUserRepository::new();
        users.expect_find_user_by_email().returning(|_| Ok(Some(alice())));
        let mut hasher = MockCredentialHasher::new();
        hasher.expect_verify_password().return_const(false);
        let mut tokens = MockTokenIssuer::new();
        tokens.expect_issue().never();

        let err = service(users, hasher, tokens)
            .login(LoginUser {
                email: Some("alice@example.com".into()),
                password: Some("wrong password".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn unknown_email_still_pays_for_a_hash_check() {
        let mut users = MockUserRepository::new();
        users.expect_find_user_by_email().returning(|_| Ok(None));
        let mut hasher = MockCredentialHasher::new();
        hasher
            .expect_verify_password()
            .withf(|_, stored| stored == DUMMY_PASSWORD_HASH)
            .times(1)
            .return_const(false);
        let mut tokens = MockTokenIssuer::new();
        tokens.expect_issue().never();

        let err = service(users, hasher, tokens)
            .login(LoginUser {
                email: Some("nobody@example.com".into()),
                password: Some("whatever1".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn login_issues_token() {
        let mut users = MockUserRepository::new();
        users.expect_find_user_by_email()
            .withf(|email| email == "alice@example.com")
            .returning(|_| Ok(Some(alice())));
        let mut hasher = MockCredentialHasher::new();
        hasher.expect_verify_password().return_const(true);
        let mut tokens = MockTokenIssuer::new();
        tokens.expect_issue().returning(|_| Ok("signed.jwt.token".into()));

        let logged_in = service(users, hasher, tokens)
            .login(LoginUser {
                email: Some("ALICE@example.com".into()),
                password: Some("correct horse".into()),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.token, "signed.jwt.token");
        assert_eq!(logged_in.user.username, "alice");
    }

    #[tokio::test]
    async fn token_failure_surfaces_as_auth_error() {
        let mut users = MockUserRepository::new();
        users.expect_find_user_by_email().returning(|_| Ok(Some(alice())));
        let mut hasher = MockCredentialHasher::new();
        hasher.expect_verify_password().return_const(true);
        let mut tokens = MockTokenIssuer::new();
        tokens.expect_issue()
            .returning(|_| Err(AuthError::Token("bad key".into())));

        let err = service(users, hasher, tokens)
            .login(LoginUser {
                email: Some("alice@example.com".into()),
                password: Some("correct horse".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    #[test]
    fn email_shape() {
        assert!(looks_like_email("a@b.io"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.io"));
        assert!(!looks_like_email("plain"));
    }
}
