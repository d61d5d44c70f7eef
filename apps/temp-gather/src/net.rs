// Host settings such as DATASTORE_EMULATOR_HOST and GCE_METADATA_HOST are
// plain `host:port`; an explicit scheme is kept.
pub fn http_base_url(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}
