//! Admission limiter metrics regression tests

use super::helpers::*;
use callward_core::CallSite;
use callward_ratelimiter::AdmissionLimiter;
use serial_test::serial;

#[tokio::test(start_paused = true)]
#[serial]
async fn admission_metrics_exist() {
    init_recorder();

    let limiter = AdmissionLimiter::builder()
        .name("test_limiter")
        .rate(1.0)
        .burst(1)
        .build()
        .unwrap();
    let site = CallSite::unary("/svc/Get");

    assert!(limiter.try_admit(&site).is_ok());
    assert!(limiter.try_admit(&site).is_err());

    assert_counter_exists("admission_calls_total");
    assert_metric_has_label("admission_calls_total", "limiter", "test_limiter");
    assert_metric_has_label("admission_calls_total", "transport", "unary");
    assert_metric_has_label("admission_calls_total", "result", "admitted");
    assert_metric_has_label("admission_calls_total", "result", "rejected");
}
