//! Reset tokens: expiry, single use, and leaving the password alone on failure.

use chrono::{Duration, Utc};

use delicious_integration_tests::{TEST_PASSWORD, TestContext, unique};
use delicious_web::db::UserRepository;
use delicious_web::services::{AuthError, AuthService};
use delicious_web::services::password_reset::{expiry_from, generate_token};

const NEW_PASSWORD: &str = "a-brand-new-password";

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL with PostGIS"]
async fn test_expired_token_is_rejected() {
    let ctx = TestContext::new().await;
    let user = ctx.create_user("Forgetful").await;
    let token = generate_token();

    UserRepository::new(&ctx.pool)
        .set_reset_token(user.id, &token, Utc::now() - Duration::minutes(1))
        .await
        .expect("set token");

    let holder = UserRepository::new(&ctx.pool)
        .get_by_reset_token(&token)
        .await
        .expect("lookup");
    assert!(holder.is_none());

    let auth = AuthService::new(&ctx.pool);
    let result = auth.reset_password(&token, NEW_PASSWORD, NEW_PASSWORD).await;
    assert!(matches!(result, Err(AuthError::InvalidResetToken)));

    auth.login(user.email.as_str(), TEST_PASSWORD)
        .await
        .expect("old password still works");
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL with PostGIS"]
async fn test_unknown_token_is_rejected() {
    let ctx = TestContext::new().await;

    let result = AuthService::new(&ctx.pool)
        .reset_password(&unique("no-such-token"), NEW_PASSWORD, NEW_PASSWORD)
        .await;

    assert!(matches!(result, Err(AuthError::InvalidResetToken)));
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL with PostGIS"]
async fn test_token_works_once() {
    let ctx = TestContext::new().await;
    let user = ctx.create_user("Locked Out").await;
    let token = generate_token();

    UserRepository::new(&ctx.pool)
        .set_reset_token(user.id, &token, expiry_from(Utc::now()))
        .await
        .expect("set token");

    let auth = AuthService::new(&ctx.pool);
    let reset = auth
        .reset_password(&token, NEW_PASSWORD, NEW_PASSWORD)
        .await
        .expect("first reset");
    assert_eq!(reset.id, user.id);

    auth.login(user.email.as_str(), NEW_PASSWORD)
        .await
        .expect("new password works");
    assert!(matches!(
        auth.login(user.email.as_str(), TEST_PASSWORD).await,
        Err(AuthError::InvalidCredentials)
    ));

    let again = auth
        .reset_password(&token, "yet-another-password", "yet-another-password")
        .await;
    assert!(matches!(again, Err(AuthError::InvalidResetToken)));
}
