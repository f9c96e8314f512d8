/// Skip a test if AWS credentials or a test scope are not configured.
#[macro_export]
macro_rules! skip_without_aws {
    () => {
        if std::env::var("AWS_ACCESS_KEY_ID").is_err() {
            eprintln!("SKIPPED: AWS_ACCESS_KEY_ID not set");
            return;
        }
        if std::env::var("BULLPEN_TEST_SECRET_SCOPE").is_err() {
            eprintln!("SKIPPED: BULLPEN_TEST_SECRET_SCOPE not set (set to a disposable scope)");
            return;
        }
    };
}
