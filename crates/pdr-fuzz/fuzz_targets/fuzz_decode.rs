#![no_main]
use libfuzzer_sys::fuzz_target;

// decode() bounds-checks every field before indexing the buffer; this target
// exists to catch a panic (index out of range, overflow) rather than to
// check any particular decoded value.
fuzz_target!(|data: &[u8]| {
    let _ = pdr_codec::decode(data);
});
