#![no_main]

use chunkfile::header::ChunkHeader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(h) = ChunkHeader::unpack(data) {
        // Anything accepted must re-pack to a block that unpacks to the same header.
        let again = ChunkHeader::unpack(&h.pack().unwrap()).unwrap();
        assert_eq!(again, h);
    }
});
