//! Contract tests for the provider quote fetcher: outcome classification,
//! payload normalization, and credential hygiene.

use tickflow_tests::{
    global_quote_body, rate_limit_body, ApiKey, FetchOutcome, HttpError, HttpResponse,
    QuoteFetcher, ScriptedHttpClient, Symbol,
};

fn fetcher_with(client: std::sync::Arc<ScriptedHttpClient>) -> QuoteFetcher {
    QuoteFetcher::new(client, ApiKey::new("test-key-123"))
}

fn symbol(raw: &str) -> Symbol {
    Symbol::parse(raw).expect("valid symbol")
}

#[tokio::test]
async fn when_provider_returns_a_quote_the_record_is_normalized() {
    // Given a provider that answers with the numbered-key quote payload
    let client = ScriptedHttpClient::single(Ok(HttpResponse::ok_json(global_quote_body())));
    let fetcher = fetcher_with(client);

    // When a quote is fetched
    let outcome = fetcher.fetch(&symbol("IBM")).await;

    // Then the payload is normalized into a typed record with a timestamp
    let FetchOutcome::Quote(record) = outcome else {
        panic!("expected a quote outcome");
    };
    assert_eq!(record.symbol, "IBM");
    assert_eq!(record.price, 150.0);
    assert_eq!(record.volume, Some(4_500_000));
    assert_eq!(record.change_percent.as_deref(), Some("1.2345%"));
    assert!(record.timestamp.is_some(), "ingestion timestamp stamped");
    assert!(record.processing_status.is_none(), "not yet processed");
}

#[tokio::test]
async fn when_provider_throttles_the_outcome_is_rate_limited_not_transport() {
    // Given a 200 response that carries a note instead of a quote object
    let client = ScriptedHttpClient::single(Ok(HttpResponse::ok_json(rate_limit_body())));
    let fetcher = fetcher_with(client);

    let outcome = fetcher.fetch(&symbol("IBM")).await;

    let FetchOutcome::RateLimitedOrMalformed { raw } = outcome else {
        panic!("expected the rate-limited outcome");
    };
    assert!(raw.contains("rate limit"), "raw payload kept for diagnostics");
}

#[tokio::test]
async fn when_the_transport_fails_the_outcome_is_transport() {
    let client = ScriptedHttpClient::single(Err(HttpError::new("connection failed: refused")));
    let fetcher = fetcher_with(client);

    let outcome = fetcher.fetch(&symbol("IBM")).await;

    assert!(matches!(outcome, FetchOutcome::Transport(_)));
}

#[tokio::test]
async fn when_provider_returns_a_server_error_the_outcome_is_transport() {
    let client = ScriptedHttpClient::single(Ok(HttpResponse {
        status: 503,
        body: String::from("upstream unavailable"),
    }));
    let fetcher = fetcher_with(client);

    let outcome = fetcher.fetch(&symbol("IBM")).await;

    let FetchOutcome::Transport(error) = outcome else {
        panic!("expected a transport outcome for non-2xx");
    };
    assert!(error.message().contains("503"));
}

#[tokio::test]
async fn fetch_makes_exactly_one_attempt() {
    // Given a transport that would keep failing if retried
    let client = ScriptedHttpClient::new(vec![
        Err(HttpError::new("request timeout")),
        Err(HttpError::new("should never be reached")),
    ]);
    let fetcher = fetcher_with(client.clone());

    let _ = fetcher.fetch(&symbol("IBM")).await;

    // Then exactly one request went out; retry policy belongs to the caller
    assert_eq!(client.seen_urls().len(), 1);
}

#[tokio::test]
async fn request_url_carries_the_credential_but_sanitized_endpoint_does_not() {
    let client = ScriptedHttpClient::single(Ok(HttpResponse::ok_json(global_quote_body())));
    let fetcher = fetcher_with(client.clone());
    let ibm = symbol("IBM");

    let _ = fetcher.fetch(&ibm).await;

    let urls = client.seen_urls();
    assert!(urls[0].contains("apikey=test-key-123"), "real call is keyed");
    assert!(urls[0].contains("function=GLOBAL_QUOTE"));

    let sanitized = fetcher.sanitized_endpoint(&ibm);
    assert!(!sanitized.contains("test-key-123"), "log form masks the key");
    assert!(sanitized.ends_with("&apikey=***"));
}
