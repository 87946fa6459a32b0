#![no_main]
use gridlog::sampler::Sample;
use gridlog::session::interpret_response;
use gridlog::timeseries::format_record;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Feed the same arbitrary body to all three endpoints
    let body = String::from_utf8_lossy(data);
    let status = if data.first().is_some_and(|b| b % 7 == 0) { 500 } else { 200 };
    let outcome = interpret_response(status, &body);

    let sample = Sample::from_responses(chrono::Local::now(), &outcome, &outcome, &outcome);
    if !sample.grid_up {
        assert_eq!(sample.grid_watts, Some(0));
    }
    let line = format_record(&sample);
    assert_eq!(line.matches('\t').count(), 6);
    assert!(line.ends_with('\n'));
});
