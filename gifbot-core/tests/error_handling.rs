use gifbot_core::{ConfigError, CoreError, ErrorExt, ErrorReporter, GiphyError, RedditApiError};
use std::time::Duration;

#[test]
fn test_error_codes() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    assert_eq!(reddit_error.error_code(), "REDDIT_API");

    let giphy_error = CoreError::Giphy(GiphyError::InvalidApiKey);
    assert_eq!(giphy_error.error_code(), "GIPHY");

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "giphy.api_key".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");

    assert_eq!(
        RedditApiError::ReplyRejected {
            reason: "RATELIMIT".to_string()
        }
        .error_code(),
        "REDDIT_REPLY_REJECTED"
    );
}

#[test]
fn test_retryable_errors() {
    let retryable_error =
        CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert!(retryable_error.is_retryable());

    let timeout = CoreError::Giphy(GiphyError::RequestTimeout { seconds: 10 });
    assert!(timeout.is_retryable());

    let non_retryable_error = CoreError::Config(ConfigError::MissingField {
        field: "reddit.password".to_string(),
    });
    assert!(!non_retryable_error.is_retryable());

    let bad_key = CoreError::Giphy(GiphyError::InvalidApiKey);
    assert!(!bad_key.is_retryable());
}

#[test]
fn test_retry_after() {
    let rate_limit_error =
        CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert_eq!(
        rate_limit_error.retry_after(),
        Some(Duration::from_secs(60))
    );

    let forbidden = CoreError::RedditApi(RedditApiError::Forbidden {
        resource: "/r/private/comments".to_string(),
    });
    assert_eq!(forbidden.retry_after(), None);
}

#[test]
fn test_user_friendly_messages() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    let message = reddit_error.user_friendly_message();
    assert!(message.contains("authentication token is invalid"));

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "giphy.api_key".to_string(),
    });
    let message = config_error.user_friendly_message();
    assert!(message.contains("giphy.api_key"));
}

#[test]
fn test_error_reporter() {
    let reporter = ErrorReporter::new();
    let error = CoreError::RedditApi(RedditApiError::InvalidToken);

    // Only checks that reporting never panics
    reporter.report_error(&error);
    reporter.report_warning(&error);
}
