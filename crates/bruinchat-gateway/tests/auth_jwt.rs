#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use bruinchat_gateway::auth::{JwtVerifier, TokenVerifier};

use common::{token, TEST_SECRET as SECRET};

#[test]
fn valid_token_yields_claims() {
    let v = JwtVerifier::new(SECRET);
    let claims = v.verify(&token("42", 3600, SECRET)).unwrap();
    assert_eq!(claims.user_id, "42");
    assert_eq!(claims.email, "42@ucla.edu");
}

#[test]
fn expired_token_is_rejected() {
    let v = JwtVerifier::new(SECRET);
    let err = v.verify(&token("42", -3600, SECRET)).unwrap_err();
    assert_eq!(err.client_code().as_str(), "AUTH_FAILED");
}

#[test]
fn wrong_secret_is_rejected() {
    let v = JwtVerifier::new(SECRET);
    assert!(v.verify(&token("42", 3600, b"other-secret")).is_err());
}

#[test]
fn empty_and_garbage_tokens_are_rejected() {
    let v = JwtVerifier::new(SECRET);
    assert!(v.verify("").is_err());
    assert!(v.verify("not.a.jwt").is_err());
}

#[test]
fn blank_user_id_is_rejected() {
    let v = JwtVerifier::new(SECRET);
    assert!(v.verify(&token("  ", 3600, SECRET)).is_err());
}

#[test]
fn secret_comes_from_named_env_var() {
    std::env::set_var("BRUINCHAT_TEST_JWT_SECRET", "from-env");
    let v = JwtVerifier::from_env("BRUINCHAT_TEST_JWT_SECRET").unwrap();
    assert!(v.verify(&token("7", 3600, b"from-env")).is_ok());

    let err = JwtVerifier::from_env("BRUINCHAT_TEST_JWT_SECRET_UNSET").err().unwrap();
    assert_eq!(err.client_code().as_str(), "INTERNAL");
}
