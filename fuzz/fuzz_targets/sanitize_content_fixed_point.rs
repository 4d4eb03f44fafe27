#![no_main]

use libfuzzer_sys::fuzz_target;
use warden_safety::{contains_whole_token, sanitize_agent_output, sanitize_content};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let once = sanitize_content(&raw);
    assert_eq!(sanitize_content(&once), once);

    let egress = sanitize_agent_output(&raw, "@junie-agent");
    assert!(!contains_whole_token("@junie-agent", &egress));
});
