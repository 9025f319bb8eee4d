//! Identity metrics.
//!
//! ## Counters
//! - `bazaar_logins_total{outcome}` - login attempts by outcome (success, failure)
//! - `bazaar_registrations_total` - principals registered

use metrics::describe_counter;

/// Register metric descriptions. Call once at startup.
pub fn register_identity_metrics() {
    describe_counter!(
        "bazaar_logins_total",
        "Total number of login attempts by outcome (success, failure)"
    );
    describe_counter!(
        "bazaar_registrations_total",
        "Total number of principals registered"
    );
}

/// Record a login attempt.
pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("bazaar_logins_total", "outcome" => outcome).increment(1);
}

/// Record a successful registration.
pub fn record_registration() {
    metrics::counter!("bazaar_registrations_total").increment(1);
}
