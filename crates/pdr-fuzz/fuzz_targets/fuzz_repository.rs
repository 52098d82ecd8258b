#![no_main]
use libfuzzer_sys::fuzz_target;
use pdr_repository::Repository;

// Interprets `data` as a stream of (opcode, args) pairs driving a sequence of
// repository mutations. Looks for panics across arbitrary add/remove/fetch
// orderings, not for any particular return value.
fuzz_target!(|data: &[u8]| {
    let mut repo = Repository::new();
    let mut handles = Vec::new();
    let mut cursor = data;

    while cursor.len() >= 3 {
        let opcode = cursor[0];
        let len = cursor[1] as usize % 64;
        let pdr_type = cursor[2];
        cursor = &cursor[3..];

        let take = len.min(cursor.len());
        let payload = &cursor[..take];
        cursor = &cursor[take..];

        match opcode % 4 {
            0 => {
                if let Ok(h) = repo.add_record(pdr_type, payload) {
                    handles.push(h);
                }
            }
            1 => {
                if let Some(&h) = handles.first() {
                    let _ = repo.remove_record(h);
                }
            }
            2 => {
                if let Some(&h) = handles.last() {
                    let _ = repo.get_pdr(h, 0);
                }
            }
            _ => {
                let _ = repo.find_pdr(pdr_type, 0);
            }
        }
    }

    let _ = repo.get_signature();
});
