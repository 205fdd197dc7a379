use super::*;

#[tokio::test]
async fn succeeds_within_timeout() {
    let mut cmd = Command::new("true");
    cmd.kill_on_drop(true);
    let output = run_with_timeout(cmd, Duration::from_secs(5), "true").await.unwrap();
    assert!(output.status.success());
}

#[tokio::test]
async fn times_out_on_slow_command() {
    let mut cmd = Command::new("sleep");
    cmd.arg("5").kill_on_drop(true);
    let result = run_with_timeout(cmd, Duration::from_millis(20), "sleep").await;
    assert!(result.unwrap_err().contains("timed out"));
}

#[tokio::test]
async fn missing_binary_is_an_error() {
    let cmd = Command::new("definitely-not-a-real-binary-xyz");
    let result = run_with_timeout(cmd, Duration::from_secs(5), "missing").await;
    assert!(result.unwrap_err().contains("missing failed"));
}
