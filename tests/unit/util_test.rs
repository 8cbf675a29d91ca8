//! Tests for utility functions

use prometheus_admission::util::{init_tracing, init_tracing_with_filter, now_ms, Ticket};

#[test]
fn test_now_ms_is_after_2020() {
    assert!(now_ms() > 1_577_836_800_000);
}

#[test]
fn test_ticket_display_matches_stored_form() {
    let ticket = Ticket::generate();
    assert_eq!(ticket.to_string(), ticket.as_str());
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    // A subscriber is now installed, so an explicit one is refused.
    assert!(init_tracing_with_filter("prometheus_admission=debug").is_err());
}

#[test]
fn test_bad_filter_directive_is_rejected() {
    assert!(init_tracing_with_filter("foo=notalevel").is_err());
}
