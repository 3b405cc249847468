// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use super::*;

fn fixed_key() -> IdempotencyKey {
    IdempotencyKey::from("fixed-key")
}

#[test]
fn attaches_scheme_prefixed_token() -> anyhow::Result<()> {
    let decorator = RequestDecorator::default();
    let out = decorator.decorate(&ApiRequest::get("/api/tickets/"), Some("a1"))?;
    assert_eq!(out.header_str("authorization"), Some("JWT a1"));
    Ok(())
}

#[test]
fn custom_scheme() -> anyhow::Result<()> {
    let decorator = RequestDecorator::new("Bearer");
    let out = decorator.decorate(&ApiRequest::get("/x"), Some("tok"))?;
    assert_eq!(out.header_str("authorization"), Some("Bearer tok"));
    Ok(())
}

#[test]
fn missing_token_sends_unauthenticated() -> anyhow::Result<()> {
    let decorator = RequestDecorator::default();
    let out = decorator.decorate(&ApiRequest::get("/api/tickets/"), None)?;
    assert!(out.headers.get(AUTHORIZATION).is_none());
    Ok(())
}

#[test]
fn post_without_key_gets_a_generated_one() -> anyhow::Result<()> {
    let decorator = RequestDecorator::default().with_key_generator(fixed_key);
    let out = decorator.decorate(&ApiRequest::post("/api/tickets/").json(json!({})), None)?;
    assert_eq!(out.header_str("idempotency-key"), Some("fixed-key"));
    assert_eq!(out.idempotency_key, Some(fixed_key()));
    Ok(())
}

#[test]
fn separate_posts_get_distinct_keys() -> anyhow::Result<()> {
    let decorator = RequestDecorator::default();
    let request = ApiRequest::post("/api/tickets/");
    let first = decorator.decorate(&request, Some("a1"))?;
    let second = decorator.decorate(&request, Some("a1"))?;
    assert_ne!(first.header_str("idempotency-key"), second.header_str("idempotency-key"));
    Ok(())
}

#[test]
fn explicit_key_is_preserved() -> anyhow::Result<()> {
    let decorator = RequestDecorator::default().with_key_generator(fixed_key);
    let request = ApiRequest::post("/auth/users/reset_password_confirm/")
        .idempotency_key(IdempotencyKey::from("caller-key"));
    let first = decorator.decorate(&request, None)?;
    let second = decorator.decorate(&request, None)?;
    assert_eq!(first.header_str("idempotency-key"), Some("caller-key"));
    assert_eq!(second.header_str("idempotency-key"), Some("caller-key"));
    Ok(())
}

#[test]
fn explicit_header_wins_regardless_of_case() -> anyhow::Result<()> {
    let decorator = RequestDecorator::default().with_key_generator(fixed_key);
    let request = ApiRequest::post("/x")
        .header("Idempotency-Key", "from-header")?
        .idempotency_key(IdempotencyKey::from("from-option"));
    let out = decorator.decorate(&request, None)?;
    assert_eq!(out.header_str("idempotency-key"), Some("from-header"));
    assert_eq!(out.headers.get_all(IDEMPOTENCY_HEADER).iter().count(), 1);
    Ok(())
}

#[test]
fn redecorating_swaps_token_and_keeps_key() -> anyhow::Result<()> {
    let decorator = RequestDecorator::default();
    let first = decorator.decorate(&ApiRequest::post("/api/tickets/"), Some("a1"))?;
    let retried = decorator.decorate(&first, Some("a2"))?;
    assert_eq!(retried.header_str("authorization"), Some("JWT a2"));
    assert_eq!(retried.header_str("idempotency-key"), first.header_str("idempotency-key"));
    Ok(())
}

#[yare::parameterized(
    get = { Method::GET },
    patch = { Method::PATCH },
    put = { Method::PUT },
    delete = { Method::DELETE },
)]
fn non_post_methods_get_no_key(method: Method) {
    let decorator = RequestDecorator::default();
    let out = decorator.decorate(&ApiRequest::new(method, "/api/tickets/1/"), Some("a1"));
    assert!(matches!(out, Ok(ref r) if r.headers.get(IDEMPOTENCY_HEADER).is_none()));
}

#[yare::parameterized(
    patch = { Method::PATCH },
    put = { Method::PUT },
    delete = { Method::DELETE },
    get = { Method::GET },
)]
fn caller_key_is_sent_on_any_method(method: Method) {
    let decorator = RequestDecorator::default().with_key_generator(fixed_key);
    let request = ApiRequest::new(method, "/api/tickets/1/").idempotency_key("k-123".into());
    let out = decorator.decorate(&request, Some("a1"));
    assert!(matches!(out, Ok(ref r) if r.header_str("idempotency-key") == Some("k-123")));
    assert!(matches!(out, Ok(ref r) if r.idempotency_key == Some(IdempotencyKey::from("k-123"))));
}

#[test]
fn decorate_does_not_touch_input() -> anyhow::Result<()> {
    let decorator = RequestDecorator::default();
    let request = ApiRequest::post("/api/tickets/");
    let _ = decorator.decorate(&request, Some("a1"))?;
    assert!(request.headers.is_empty());
    assert!(request.idempotency_key.is_none());
    Ok(())
}

#[test]
fn token_with_newline_is_invalid() {
    let decorator = RequestDecorator::default();
    let out = decorator.decorate(&ApiRequest::get("/x"), Some("bad\ntoken"));
    assert!(matches!(out, Err(ApiError::InvalidRequest(_))));
}
