#![no_main]

use chunkfile::chunk::chunk_file_name;
use chunkfile::directory::ChunkDirectory;
use chunkfile::{ChunkConfig, MemoryStorage, Storage};
use libfuzzer_sys::fuzz_target;
use std::path::Path;
use std::sync::Arc;

// Input is split on 0xFF into up to 4 chunk files; loading must never panic.
fuzz_target!(|data: &[u8]| {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let root = Path::new("/s");
    storage.create_dir(root).unwrap();
    for (i, part) in data.split(|&b| b == 0xFF).take(4).enumerate() {
        storage
            .create_new(&root.join(chunk_file_name(i as u64)), part)
            .unwrap();
    }
    let _ = ChunkDirectory::load(storage, root, ChunkConfig::with_chunk_data_size(64));
});
